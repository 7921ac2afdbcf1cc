//! Event domain model.
//!
//! # Responsibility
//! - Hold one concrete scheduled occurrence and the event types it uses.
//! - Suggest event types that can be attached without redundancy.
//!
//! # Invariants
//! - `event_type_ids` never repeats an id.
//! - `end_time` is not earlier than `start_time` once validated.
//! - Redundancy (one attached type subsuming another) is filtered from
//!   suggestions only; `add_event_type` rejects exact duplicates only.

use crate::model::event_type::{resolve_event_types, EventType};
use crate::model::ids::{
    ensure_unique_ids, format_id_list, parse_id_list, EventId, EventTypeId, IdListError,
};
use crate::model::lifecycle::{LifecycleError, PublishState};
use crate::model::relation::{RelationError, ResolvedCache};
use crate::repo::event_type_repo::EventTypeRepository;
use crate::repo::ListQuery;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Event validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventValidationError {
    InvalidTimeWindow { start: i64, end: i64 },
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimeWindow { start, end } => {
                write!(f, "end_time ({end}) must be >= start_time ({start})")
            }
        }
    }
}

impl Error for EventValidationError {}

/// Plain persisted shape of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub name: String,
    pub location: String,
    /// Unix seconds.
    pub start_time: i64,
    /// Unix seconds.
    pub end_time: i64,
    pub event_type_ids: Vec<EventTypeId>,
    pub state: PublishState,
}

/// Concrete scheduled occurrence built from one or more event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EventRecord", into = "EventRecord")]
pub struct Event {
    id: EventId,
    name: String,
    location: String,
    start_time: i64,
    end_time: i64,
    event_type_ids: Vec<EventTypeId>,
    state: PublishState,
    event_types: ResolvedCache<EventType>,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.location == other.location
            && self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.event_type_ids == other.event_type_ids
            && self.state == other.state
    }
}

impl Eq for Event {}

impl TryFrom<EventRecord> for Event {
    type Error = IdListError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        ensure_unique_ids(&record.event_type_ids)?;
        Ok(Self {
            id: record.id,
            name: record.name,
            location: record.location,
            start_time: record.start_time,
            end_time: record.end_time,
            event_type_ids: record.event_type_ids,
            state: record.state,
            event_types: ResolvedCache::default(),
        })
    }
}

impl From<Event> for EventRecord {
    fn from(value: Event) -> Self {
        Self {
            id: value.id,
            name: value.name,
            location: value.location,
            start_time: value.start_time,
            end_time: value.end_time,
            event_type_ids: value.event_type_ids,
            state: value.state,
        }
    }
}

impl Event {
    /// Creates an empty draft event for an already allocated id.
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            name: String::new(),
            location: String::new(),
            start_time: 0,
            end_time: 0,
            event_type_ids: Vec::new(),
            state: PublishState::Draft,
            event_types: ResolvedCache::default(),
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    /// Sets both bounds (unix seconds). Checked by `validate`.
    pub fn set_time_window(&mut self, start_time: i64, end_time: i64) {
        self.start_time = start_time;
        self.end_time = end_time;
    }

    pub fn state(&self) -> PublishState {
        self.state
    }

    pub fn publish(&mut self) -> Result<(), LifecycleError> {
        self.state.publish()
    }

    pub fn soft_delete(&mut self) {
        self.state.soft_delete();
    }

    /// Validates the time window.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.end_time < self.start_time {
            return Err(EventValidationError::InvalidTimeWindow {
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }

    pub fn event_type_ids(&self) -> &[EventTypeId] {
        &self.event_type_ids
    }

    pub fn event_type_ids_csv(&self) -> String {
        format_id_list(&self.event_type_ids)
    }

    /// Resolves attached event types, caching until the ids change.
    ///
    /// A dangling id is a data integrity failure and is reported, never
    /// skipped.
    pub fn event_types<R: EventTypeRepository + ?Sized>(
        &mut self,
        repo: &R,
    ) -> Result<&[EventType], RelationError> {
        let ids = &self.event_type_ids;
        self.event_types.get_or_try_fill(|| resolve_event_types(repo, ids))
    }

    /// Attaches an event type.
    ///
    /// # Errors
    /// - `DuplicateEventType` when it is already attached.
    pub fn add_event_type(&mut self, event_type: &EventType) -> Result<(), RelationError> {
        let event_type_id = event_type.id();
        if self.event_type_ids.contains(&event_type_id) {
            return Err(RelationError::DuplicateEventType {
                event: self.id,
                event_type: event_type_id,
            });
        }
        self.event_type_ids.push(event_type_id);
        self.event_types.push_if_fresh(event_type.clone());
        Ok(())
    }

    /// Detaches an event type by id. Returns whether anything changed.
    pub fn remove_event_type(&mut self, event_type_id: EventTypeId) -> bool {
        let before = self.event_type_ids.len();
        self.event_type_ids.retain(|id| *id != event_type_id);
        self.event_types.retain(|event_type| event_type.id() != event_type_id);
        before != self.event_type_ids.len()
    }

    /// Replaces the attached event type ids.
    pub fn set_event_type_ids(&mut self, ids: Vec<EventTypeId>) -> Result<(), RelationError> {
        ensure_unique_ids(&ids)?;
        self.event_type_ids = ids;
        self.event_types.invalidate();
        Ok(())
    }

    /// `set_event_type_ids` from comma separated input (`""` clears).
    pub fn set_event_types_csv(&mut self, csv: &str) -> Result<(), RelationError> {
        let ids = parse_id_list(csv)?;
        self.set_event_type_ids(ids)
    }

    /// Listed event types that can be attached without redundancy.
    ///
    /// A candidate is dropped when it is already attached, when it is in
    /// the recursive subtype closure of an attached type, or when an
    /// attached type is in the candidate's own closure.
    pub fn addable_event_types<R: EventTypeRepository + ?Sized>(
        &mut self,
        repo: &R,
    ) -> Result<Vec<EventType>, RelationError> {
        let attached: Vec<EventType> = self.event_types(repo)?.to_vec();
        let attached_ids: HashSet<EventTypeId> =
            attached.iter().map(EventType::id).collect();

        let mut covered = HashSet::new();
        for event_type in &attached {
            covered.extend(event_type.subtype_ids_recursive(repo)?);
        }

        let mut addable = Vec::new();
        for candidate in repo.list_event_types(&ListQuery::default())? {
            if attached_ids.contains(&candidate.id()) || covered.contains(&candidate.id()) {
                continue;
            }
            let subsumes_attached = candidate
                .subtype_ids_recursive(repo)?
                .iter()
                .any(|id| attached_ids.contains(id));
            if subsumes_attached {
                continue;
            }
            addable.push(candidate);
        }
        Ok(addable)
    }
}
