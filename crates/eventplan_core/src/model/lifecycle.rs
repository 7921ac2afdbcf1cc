//! Publication lifecycle shared by event types and events.
//!
//! # Invariants
//! - `Deleted` is terminal: nothing moves an entity out of it.
//! - Only `Published` entities appear in catalogue listings.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Draft → Published → Deleted state of an administrable entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    /// Created but not yet submitted by an administrator.
    #[default]
    Draft,
    /// Submitted and visible in listings.
    Published,
    /// Soft-deleted. Retrievable by id, excluded from listings.
    Deleted,
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    AlreadyDeleted,
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyDeleted => write!(f, "entity is deleted and cannot be published"),
        }
    }
}

impl Error for LifecycleError {}

impl PublishState {
    /// Moves a draft to published. Publishing twice is a no-op.
    pub fn publish(&mut self) -> Result<(), LifecycleError> {
        match self {
            Self::Deleted => Err(LifecycleError::AlreadyDeleted),
            Self::Draft | Self::Published => {
                *self = Self::Published;
                Ok(())
            }
        }
    }

    /// Soft-deletes from any state.
    pub fn soft_delete(&mut self) {
        *self = Self::Deleted;
    }

    /// Whether catalogue listings include this entity.
    pub fn is_listed(self) -> bool {
        self == Self::Published
    }

    pub fn is_deleted(self) -> bool {
        self == Self::Deleted
    }

    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Deleted => "deleted",
        }
    }

    /// Parses the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}
