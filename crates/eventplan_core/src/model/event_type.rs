//! Event type domain model.
//!
//! # Responsibility
//! - Hold one reusable event template: its subtypes and task definitions.
//! - Guard every subtype mutation so the subtype graph stays acyclic.
//! - Answer closure queries (recursive subtypes, addable candidates).
//!
//! # Invariants
//! - No event type is (transitively) its own subtype; `append_causes_cycle`
//!   is the only cycle check and every guard routes through it.
//! - `subtype_ids` and `task_definition_ids` never repeat an id.
//! - Resolved caches agree with their id lists or are stale.
//! - Mutations are in-memory only; callers persist through the repository.

use crate::model::ids::{
    ensure_unique_ids, format_id_list, parse_id_list, EntityKind, EventTypeId, IdListError,
    TaskDefinitionId,
};
use crate::model::lifecycle::{LifecycleError, PublishState};
use crate::model::relation::{RelationError, ResolvedCache};
use crate::model::subtype_graph::{closure, reaches, ShadowedGraph, StoredGraph};
use crate::model::task_definition::TaskDefinition;
use crate::repo::event_type_repo::EventTypeRepository;
use crate::repo::task_definition_repo::TaskDefinitionRepository;
use crate::repo::ListQuery;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Plain persisted shape of an event type.
///
/// Used for storage decoding and as the serde wire form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeRecord {
    pub id: EventTypeId,
    pub display_name: String,
    pub description: String,
    pub subtype_ids: Vec<EventTypeId>,
    pub task_definition_ids: Vec<TaskDefinitionId>,
    pub state: PublishState,
}

/// Reusable event template with nested subtypes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EventTypeRecord", into = "EventTypeRecord")]
pub struct EventType {
    id: EventTypeId,
    display_name: String,
    description: String,
    subtype_ids: Vec<EventTypeId>,
    task_definition_ids: Vec<TaskDefinitionId>,
    state: PublishState,
    subtypes: ResolvedCache<EventType>,
    task_definitions: ResolvedCache<TaskDefinition>,
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.display_name == other.display_name
            && self.description == other.description
            && self.subtype_ids == other.subtype_ids
            && self.task_definition_ids == other.task_definition_ids
            && self.state == other.state
    }
}

impl Eq for EventType {}

impl TryFrom<EventTypeRecord> for EventType {
    type Error = IdListError;

    fn try_from(record: EventTypeRecord) -> Result<Self, Self::Error> {
        ensure_unique_ids(&record.subtype_ids)?;
        ensure_unique_ids(&record.task_definition_ids)?;
        Ok(Self {
            id: record.id,
            display_name: record.display_name,
            description: record.description,
            subtype_ids: record.subtype_ids,
            task_definition_ids: record.task_definition_ids,
            state: record.state,
            subtypes: ResolvedCache::default(),
            task_definitions: ResolvedCache::default(),
        })
    }
}

impl From<EventType> for EventTypeRecord {
    fn from(value: EventType) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name,
            description: value.description,
            subtype_ids: value.subtype_ids,
            task_definition_ids: value.task_definition_ids,
            state: value.state,
        }
    }
}

impl EventType {
    /// Creates an empty draft event type for an already allocated id.
    pub fn new(id: EventTypeId) -> Self {
        Self {
            id,
            display_name: String::new(),
            description: String::new(),
            subtype_ids: Vec::new(),
            task_definition_ids: Vec::new(),
            state: PublishState::Draft,
            subtypes: ResolvedCache::default(),
            task_definitions: ResolvedCache::default(),
        }
    }

    pub fn id(&self) -> EventTypeId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    /// Client-visible description.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn state(&self) -> PublishState {
        self.state
    }

    /// Marks the event type as submitted, making it visible in listings.
    pub fn publish(&mut self) -> Result<(), LifecycleError> {
        self.state.publish()
    }

    pub fn soft_delete(&mut self) {
        self.state.soft_delete();
    }

    /// Direct subtype ids in insertion order.
    pub fn subtype_ids(&self) -> &[EventTypeId] {
        &self.subtype_ids
    }

    /// Direct subtype ids as stored, e.g. `"1,2,4,5"` or `""`.
    pub fn subtype_ids_csv(&self) -> String {
        format_id_list(&self.subtype_ids)
    }

    pub fn task_definition_ids(&self) -> &[TaskDefinitionId] {
        &self.task_definition_ids
    }

    pub fn task_definition_ids_csv(&self) -> String {
        format_id_list(&self.task_definition_ids)
    }

    /// Resolves direct subtypes, caching the result until the ids change.
    ///
    /// # Errors
    /// - `Unresolved` when a subtype id is unknown to the repository.
    pub fn subtypes<R: EventTypeRepository + ?Sized>(
        &mut self,
        repo: &R,
    ) -> Result<&[EventType], RelationError> {
        let ids = &self.subtype_ids;
        self.subtypes.get_or_try_fill(|| resolve_event_types(repo, ids))
    }

    /// Adds `candidate` as a direct subtype.
    ///
    /// # Errors
    /// - `DuplicateEdge` when it is already a direct subtype.
    /// - `CycleDetected` when `candidate` is this event type or already
    ///   (transitively) contains it.
    pub fn add_subtype<R: EventTypeRepository + ?Sized>(
        &mut self,
        candidate: &EventType,
        repo: &R,
    ) -> Result<(), RelationError> {
        if self.subtype_ids.contains(&candidate.id) {
            return Err(RelationError::DuplicateEdge {
                parent: self.id,
                subtype: candidate.id,
            });
        }
        if self.append_causes_cycle(candidate, repo)? {
            return Err(RelationError::CycleDetected {
                parent: self.id,
                subtype: candidate.id,
            });
        }

        self.subtype_ids.push(candidate.id);
        self.subtypes.push_if_fresh(candidate.clone());
        Ok(())
    }

    /// Removes a direct subtype by id. Returns whether anything changed.
    pub fn remove_subtype(&mut self, subtype_id: EventTypeId) -> bool {
        let before = self.subtype_ids.len();
        self.subtype_ids.retain(|id| *id != subtype_id);
        self.subtypes.retain(|subtype| subtype.id != subtype_id);
        before != self.subtype_ids.len()
    }

    /// Returns whether adding `candidate` as a subtype would close a cycle.
    ///
    /// The candidate's in-memory subtype list is used for its own edges;
    /// deeper edges come from the repository.
    pub fn append_causes_cycle<R: EventTypeRepository + ?Sized>(
        &self,
        candidate: &EventType,
        repo: &R,
    ) -> Result<bool, RelationError> {
        if candidate.id == self.id {
            return Ok(true);
        }
        let stored = StoredGraph::new(repo);
        let graph = ShadowedGraph::new(&stored, candidate);
        reaches(&graph, candidate.id, self.id)
    }

    /// All transitive subtype ids, without repeats.
    pub fn subtype_ids_recursive<R: EventTypeRepository + ?Sized>(
        &self,
        repo: &R,
    ) -> Result<Vec<EventTypeId>, RelationError> {
        let stored = StoredGraph::new(repo);
        let graph = ShadowedGraph::new(&stored, self);
        closure(&graph, &self.subtype_ids)
    }

    /// Returns whether `other_id` is absent from the recursive subtype closure.
    pub fn excludes_subtype<R: EventTypeRepository + ?Sized>(
        &self,
        other_id: EventTypeId,
        repo: &R,
    ) -> Result<bool, RelationError> {
        Ok(!self.subtype_ids_recursive(repo)?.contains(&other_id))
    }

    /// Listed event types that could become new subtypes: not already
    /// included at any depth and not closing a cycle.
    pub fn addable_event_types<R: EventTypeRepository + ?Sized>(
        &self,
        repo: &R,
    ) -> Result<Vec<EventType>, RelationError> {
        let included: HashSet<EventTypeId> =
            self.subtype_ids_recursive(repo)?.into_iter().collect();

        let mut addable = Vec::new();
        for candidate in repo.list_event_types(&ListQuery::default())? {
            if included.contains(&candidate.id) {
                continue;
            }
            if self.append_causes_cycle(&candidate, repo)? {
                continue;
            }
            addable.push(candidate);
        }
        Ok(addable)
    }

    /// Replaces the direct subtypes.
    ///
    /// Every new id is checked against the stored graph: it must resolve
    /// and must not lead back to this event type.
    ///
    /// # Errors
    /// - `IdList(DuplicateIds)` when `ids` repeats an id.
    /// - `CycleDetected` for a self reference or a path back to this type.
    /// - `Unresolved` for unknown ids.
    pub fn set_subtype_ids<R: EventTypeRepository + ?Sized>(
        &mut self,
        ids: Vec<EventTypeId>,
        repo: &R,
    ) -> Result<(), RelationError> {
        ensure_unique_ids(&ids)?;
        if ids.contains(&self.id) {
            return Err(RelationError::CycleDetected {
                parent: self.id,
                subtype: self.id,
            });
        }

        for candidate in resolve_event_types(repo, &ids)? {
            if self.append_causes_cycle(&candidate, repo)? {
                return Err(RelationError::CycleDetected {
                    parent: self.id,
                    subtype: candidate.id,
                });
            }
        }

        self.subtype_ids = ids;
        self.subtypes.invalidate();
        Ok(())
    }

    /// `set_subtype_ids` from comma separated input (`""` clears).
    pub fn set_subtypes_csv<R: EventTypeRepository + ?Sized>(
        &mut self,
        csv: &str,
        repo: &R,
    ) -> Result<(), RelationError> {
        let ids = parse_id_list(csv)?;
        self.set_subtype_ids(ids, repo)
    }

    /// Resolves task definitions, caching the result until the ids change.
    ///
    /// # Errors
    /// - `Unresolved` when a task definition id is unknown.
    pub fn task_definitions<T: TaskDefinitionRepository + ?Sized>(
        &mut self,
        repo: &T,
    ) -> Result<&[TaskDefinition], RelationError> {
        let ids = &self.task_definition_ids;
        self.task_definitions.get_or_try_fill(|| resolve_task_definitions(repo, ids))
    }

    /// Adds a persisted task definition.
    ///
    /// Returns `false` without changes when the definition has no id yet
    /// or is already present.
    pub fn add_task_definition(&mut self, definition: &TaskDefinition) -> bool {
        let Some(id) = definition.id() else {
            return false;
        };
        if self.task_definition_ids.contains(&id) {
            return false;
        }
        self.task_definition_ids.push(id);
        self.task_definitions.push_if_fresh(definition.clone());
        true
    }

    /// Removes a task definition by id. Returns whether anything changed.
    pub fn remove_task_definition(&mut self, task_definition_id: TaskDefinitionId) -> bool {
        let before = self.task_definition_ids.len();
        self.task_definition_ids.retain(|id| *id != task_definition_id);
        self.task_definitions
            .retain(|definition| definition.id() != Some(task_definition_id));
        before != self.task_definition_ids.len()
    }

    /// Replaces the task definition ids.
    pub fn set_task_definition_ids(
        &mut self,
        ids: Vec<TaskDefinitionId>,
    ) -> Result<(), RelationError> {
        ensure_unique_ids(&ids)?;
        self.task_definition_ids = ids;
        self.task_definitions.invalidate();
        Ok(())
    }

    /// `set_task_definition_ids` from comma separated input (`""` clears).
    pub fn set_task_definitions_csv(&mut self, csv: &str) -> Result<(), RelationError> {
        let ids = parse_id_list(csv)?;
        self.set_task_definition_ids(ids)
    }
}

/// Resolves event type ids in order; unknown ids fail.
pub(crate) fn resolve_event_types<R: EventTypeRepository + ?Sized>(
    repo: &R,
    ids: &[EventTypeId],
) -> Result<Vec<EventType>, RelationError> {
    ids.iter()
        .map(|&id| {
            repo.get_event_type(id)?.ok_or(RelationError::Unresolved {
                kind: EntityKind::EventType,
                id,
            })
        })
        .collect()
}

fn resolve_task_definitions<T: TaskDefinitionRepository + ?Sized>(
    repo: &T,
    ids: &[TaskDefinitionId],
) -> Result<Vec<TaskDefinition>, RelationError> {
    ids.iter()
        .map(|&id| {
            repo.get_task_definition(id)?
                .ok_or(RelationError::Unresolved {
                    kind: EntityKind::TaskDefinition,
                    id,
                })
        })
        .collect()
}
