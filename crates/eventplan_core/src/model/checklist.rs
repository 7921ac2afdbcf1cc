//! Task checklist derivation for events.
//!
//! # Responsibility
//! - Flatten the event types attached to an event (including all nested
//!   subtypes) into one deduplicated list of dated tasks.
//!
//! # Invariants
//! - Each task definition appears once, attributed to the first event type
//!   that contributes it in closure order.
//! - Dates are unix seconds offset backwards from the event start.

use crate::model::event::Event;
use crate::model::ids::{EntityKind, EventTypeId, TaskDefinitionId};
use crate::model::relation::RelationError;
use crate::model::subtype_graph::{closure, StoredGraph};
use crate::repo::event_type_repo::EventTypeRepository;
use crate::repo::task_definition_repo::TaskDefinitionRepository;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Seconds in one scheduling day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// One task of an event checklist with computed dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub task_definition_id: TaskDefinitionId,
    /// Event type whose template contributed this task.
    pub source_event_type_id: EventTypeId,
    pub title: String,
    pub description: String,
    /// Unix seconds when work should begin.
    pub starts_at: i64,
    /// Unix seconds when the task is due.
    pub due_at: i64,
}

/// Derives the checklist of `event` from its attached event types.
///
/// # Errors
/// - `Unresolved` when any event type or task definition in the closure
///   is missing from storage.
pub fn derive_checklist<R, T>(
    event: &Event,
    event_types: &R,
    task_definitions: &T,
) -> Result<Vec<PlannedTask>, RelationError>
where
    R: EventTypeRepository + ?Sized,
    T: TaskDefinitionRepository + ?Sized,
{
    let graph = StoredGraph::new(event_types);
    let event_type_ids = closure(&graph, event.event_type_ids())?;

    let mut seen = HashSet::new();
    let mut planned = Vec::new();
    for event_type_id in event_type_ids {
        let event_type = event_types
            .get_event_type(event_type_id)?
            .ok_or(RelationError::Unresolved {
                kind: EntityKind::EventType,
                id: event_type_id,
            })?;

        for &task_definition_id in event_type.task_definition_ids() {
            if !seen.insert(task_definition_id) {
                continue;
            }
            let definition = task_definitions
                .get_task_definition(task_definition_id)?
                .ok_or(RelationError::Unresolved {
                    kind: EntityKind::TaskDefinition,
                    id: task_definition_id,
                })?;

            planned.push(PlannedTask {
                task_definition_id,
                source_event_type_id: event_type_id,
                title: definition.title().to_string(),
                description: definition.description().to_string(),
                starts_at: offset_before(event.start_time(), definition.start_offset_in_days()),
                due_at: offset_before(event.start_time(), definition.finish_offset_in_days()),
            });
        }
    }
    Ok(planned)
}

fn offset_before(start_time: i64, days: u32) -> i64 {
    start_time.saturating_sub(i64::from(days) * SECONDS_PER_DAY)
}
