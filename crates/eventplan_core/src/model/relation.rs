//! Relation mutation errors and the resolved-reference cache.
//!
//! # Responsibility
//! - Define the typed failures of subtype, task definition and event type
//!   relation operations.
//! - Cache id lists resolved into entities until the ids change.
//!
//! # Invariants
//! - A fresh cache holds exactly the entities named by its id list, in
//!   the same order. Any id mutation either keeps that true or marks the
//!   cache stale.
//! - A fresh empty cache is a valid terminal state and is not recomputed.

use crate::model::ids::{EntityKind, EventId, EventTypeId, IdListError};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Typed failure of a relation mutation or reference resolution.
#[derive(Debug)]
pub enum RelationError {
    /// Adding `subtype` under `parent` would close a cycle (including
    /// `parent == subtype`).
    CycleDetected {
        parent: EventTypeId,
        subtype: EventTypeId,
    },
    /// `subtype` is already a direct subtype of `parent`.
    DuplicateEdge {
        parent: EventTypeId,
        subtype: EventTypeId,
    },
    /// `event_type` is already attached to `event`.
    DuplicateEventType {
        event: EventId,
        event_type: EventTypeId,
    },
    /// Bulk id input was malformed or repeated an id.
    IdList(IdListError),
    /// A stored reference points at an id the repository does not know.
    Unresolved { kind: EntityKind, id: i64 },
    /// Repository failure while following references.
    Repo(RepoError),
}

impl Display for RelationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleDetected { parent, subtype } => write!(
                f,
                "adding subtype {subtype} to event type {parent} would create a cycle"
            ),
            Self::DuplicateEdge { parent, subtype } => {
                write!(f, "event type {parent} already has subtype {subtype}")
            }
            Self::DuplicateEventType { event, event_type } => {
                write!(f, "event {event} already has event type {event_type}")
            }
            Self::IdList(err) => write!(f, "{err}"),
            Self::Unresolved { kind, id } => write!(f, "dangling {kind} reference: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RelationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IdList(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IdListError> for RelationError {
    fn from(value: IdListError) -> Self {
        Self::IdList(value)
    }
}

impl From<RepoError> for RelationError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Lazily resolved entities for an id list, guarded by a freshness flag.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedCache<T> {
    entries: Vec<T>,
    fresh: bool,
}

impl<T> Default for ResolvedCache<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            fresh: false,
        }
    }
}

impl<T> ResolvedCache<T> {
    /// Drops cached entries; the next read resolves again.
    pub(crate) fn invalidate(&mut self) {
        self.entries.clear();
        self.fresh = false;
    }

    #[cfg(test)]
    pub(crate) fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Appends to a fresh cache. A stale cache stays stale.
    pub(crate) fn push_if_fresh(&mut self, value: T) {
        if self.fresh {
            self.entries.push(value);
        }
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.entries.retain(keep);
    }

    /// Returns cached entries, resolving them first when stale.
    pub(crate) fn get_or_try_fill<E>(
        &mut self,
        fill: impl FnOnce() -> Result<Vec<T>, E>,
    ) -> Result<&[T], E> {
        if !self.fresh {
            self.entries = fill()?;
            self.fresh = true;
        }
        Ok(&self.entries)
    }
}
