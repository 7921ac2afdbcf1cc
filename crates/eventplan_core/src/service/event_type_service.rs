//! Event type use-case service.
//!
//! # Responsibility
//! - Orchestrate event type details, lifecycle and subtype edits.
//! - Own task definition flows that span both stores (create-and-attach,
//!   cascade delete).
//!
//! # Invariants
//! - Subtype edits go through `EventType` relation checks before any write.
//! - Deleting a task definition first detaches it from every event type.
//! - Flows that write more than one row run inside one `atomically` scope.

use crate::model::event_type::EventType;
use crate::model::ids::{EntityKind, EventTypeId, TaskDefinitionId};
use crate::model::lifecycle::PublishState;
use crate::model::task_definition::TaskDefinition;
use crate::repo::event_type_repo::EventTypeRepository;
use crate::repo::task_definition_repo::TaskDefinitionRepository;
use crate::repo::{ListQuery, WriteScope};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::logged;
use log::info;

/// Input for creating or editing a task definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinitionInput {
    pub title: String,
    pub start_offset_in_days: u32,
    pub finish_offset_in_days: u32,
    pub description: String,
}

/// Use-case service for event types and their task definitions.
pub struct EventTypeService<E: EventTypeRepository, T: TaskDefinitionRepository> {
    event_types: E,
    task_definitions: T,
}

impl<E: EventTypeRepository, T: TaskDefinitionRepository> EventTypeService<E, T> {
    pub fn new(event_types: E, task_definitions: T) -> Self {
        Self {
            event_types,
            task_definitions,
        }
    }

    /// Creates a draft event type with the given details.
    pub fn create_event_type(
        &self,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> ServiceResult<EventType> {
        let display_name: String = display_name.into();
        let description: String = description.into();
        let event_type = logged(
            "event_type_create",
            0,
            self.event_types.atomically(|| {
                let mut event_type = self.event_types.create_event_type()?;
                event_type.set_display_name(display_name);
                event_type.set_description(description);
                self.event_types.update_event_type(&event_type)?;
                Ok(event_type)
            }),
        )?;

        info!(
            "event=event_type_create module=service status=ok id={}",
            event_type.id()
        );
        Ok(event_type)
    }

    /// Gets one event type, soft-deleted included.
    pub fn get_event_type(&self, id: EventTypeId) -> ServiceResult<EventType> {
        self.event_types
            .get_event_type(id)?
            .ok_or(ServiceError::NotFound {
                kind: EntityKind::EventType,
                id,
            })
    }

    pub fn list_event_types(&self, query: &ListQuery) -> ServiceResult<Vec<EventType>> {
        Ok(self.event_types.list_event_types(query)?)
    }

    pub fn update_details(
        &self,
        id: EventTypeId,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> ServiceResult<EventType> {
        let event_type = logged(
            "event_type_update",
            id,
            self.try_update_details(id, display_name.into(), description.into()),
        )?;
        info!("event=event_type_update module=service status=ok id={id}");
        Ok(event_type)
    }

    fn try_update_details(
        &self,
        id: EventTypeId,
        display_name: String,
        description: String,
    ) -> ServiceResult<EventType> {
        let mut event_type = self.get_event_type(id)?;
        event_type.set_display_name(display_name);
        event_type.set_description(description);
        self.event_types.update_event_type(&event_type)?;
        Ok(event_type)
    }

    /// Submits an event type so it appears in the catalogue.
    pub fn publish_event_type(&self, id: EventTypeId) -> ServiceResult<PublishState> {
        let state = logged(
            "event_type_publish",
            id,
            self.event_types.publish_event_type(id).map_err(Into::into),
        )?;
        info!("event=event_type_publish module=service status=ok id={id}");
        Ok(state)
    }

    /// Soft-deletes an event type. Existing references keep resolving.
    pub fn delete_event_type(&self, id: EventTypeId) -> ServiceResult<()> {
        logged(
            "event_type_delete",
            id,
            self.event_types
                .soft_delete_event_type(id)
                .map_err(Into::into),
        )?;
        info!("event=event_type_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Resolved direct subtypes of one event type.
    pub fn subtypes(&self, id: EventTypeId) -> ServiceResult<Vec<EventType>> {
        let mut event_type = self.get_event_type(id)?;
        Ok(event_type.subtypes(&self.event_types)?.to_vec())
    }

    /// Catalogue event types that can be added as subtypes of `id`.
    pub fn addable_subtypes(&self, id: EventTypeId) -> ServiceResult<Vec<EventType>> {
        let event_type = self.get_event_type(id)?;
        Ok(event_type.addable_event_types(&self.event_types)?)
    }

    /// Adds `subtype_id` under `parent_id` and persists the parent.
    ///
    /// # Errors
    /// - `NotFound` when either event type is missing.
    /// - `Relation(DuplicateEdge | CycleDetected)` when the edge is illegal.
    pub fn add_subtype(
        &self,
        parent_id: EventTypeId,
        subtype_id: EventTypeId,
    ) -> ServiceResult<EventType> {
        let parent = logged(
            "subtype_add",
            parent_id,
            self.try_add_subtype(parent_id, subtype_id),
        )?;
        info!(
            "event=subtype_add module=service status=ok id={parent_id} subtype_id={subtype_id}"
        );
        Ok(parent)
    }

    fn try_add_subtype(
        &self,
        parent_id: EventTypeId,
        subtype_id: EventTypeId,
    ) -> ServiceResult<EventType> {
        let mut parent = self.get_event_type(parent_id)?;
        let subtype = self.get_event_type(subtype_id)?;
        parent.add_subtype(&subtype, &self.event_types)?;
        self.event_types.update_event_type(&parent)?;
        Ok(parent)
    }

    /// Removes a direct subtype. Returns whether the parent changed.
    pub fn remove_subtype(
        &self,
        parent_id: EventTypeId,
        subtype_id: EventTypeId,
    ) -> ServiceResult<bool> {
        let changed = logged(
            "subtype_remove",
            parent_id,
            self.try_remove_subtype(parent_id, subtype_id),
        )?;
        info!(
            "event=subtype_remove module=service status=ok id={parent_id} subtype_id={subtype_id} changed={changed}"
        );
        Ok(changed)
    }

    fn try_remove_subtype(
        &self,
        parent_id: EventTypeId,
        subtype_id: EventTypeId,
    ) -> ServiceResult<bool> {
        let mut parent = self.get_event_type(parent_id)?;
        let changed = parent.remove_subtype(subtype_id);
        if changed {
            self.event_types.update_event_type(&parent)?;
        }
        Ok(changed)
    }

    /// Replaces the direct subtypes from comma separated ids.
    pub fn replace_subtypes(&self, id: EventTypeId, csv: &str) -> ServiceResult<EventType> {
        let event_type = logged("subtype_replace", id, self.try_replace_subtypes(id, csv))?;
        info!(
            "event=subtype_replace module=service status=ok id={id} count={}",
            event_type.subtype_ids().len()
        );
        Ok(event_type)
    }

    fn try_replace_subtypes(&self, id: EventTypeId, csv: &str) -> ServiceResult<EventType> {
        let mut event_type = self.get_event_type(id)?;
        event_type.set_subtypes_csv(csv, &self.event_types)?;
        self.event_types.update_event_type(&event_type)?;
        Ok(event_type)
    }

    /// Resolved task definitions of one event type.
    pub fn task_definitions(&self, id: EventTypeId) -> ServiceResult<Vec<TaskDefinition>> {
        let mut event_type = self.get_event_type(id)?;
        Ok(event_type.task_definitions(&self.task_definitions)?.to_vec())
    }

    /// Creates a task definition and attaches it to `event_type_id`.
    ///
    /// The insert and the attach commit together, so a rejected attach never
    /// leaves an orphaned definition behind.
    pub fn create_task_definition(
        &self,
        event_type_id: EventTypeId,
        input: &TaskDefinitionInput,
    ) -> ServiceResult<TaskDefinition> {
        let definition = logged(
            "task_definition_create",
            event_type_id,
            self.try_create_task_definition(event_type_id, input),
        )?;
        info!(
            "event=task_definition_create module=service status=ok id={event_type_id} task_definition_id={}",
            definition.id().unwrap_or_default()
        );
        Ok(definition)
    }

    fn try_create_task_definition(
        &self,
        event_type_id: EventTypeId,
        input: &TaskDefinitionInput,
    ) -> ServiceResult<TaskDefinition> {
        let mut event_type = self.get_event_type(event_type_id)?;

        let mut definition = TaskDefinition::new(
            input.title.clone(),
            input.start_offset_in_days,
            input.finish_offset_in_days,
            input.description.clone(),
        );
        definition.validate()?;

        self.event_types.atomically(|| {
            let id = self.task_definitions.insert_task_definition(&definition)?;
            definition.assign_id(id)?;
            if event_type.add_task_definition(&definition) {
                self.event_types.update_event_type(&event_type)?;
            }
            Ok(definition)
        })
    }

    /// Rewrites the fields of an existing task definition.
    pub fn edit_task_definition(
        &self,
        id: TaskDefinitionId,
        input: &TaskDefinitionInput,
    ) -> ServiceResult<TaskDefinition> {
        let definition = logged(
            "task_definition_edit",
            id,
            self.try_edit_task_definition(id, input),
        )?;
        info!("event=task_definition_edit module=service status=ok task_definition_id={id}");
        Ok(definition)
    }

    fn try_edit_task_definition(
        &self,
        id: TaskDefinitionId,
        input: &TaskDefinitionInput,
    ) -> ServiceResult<TaskDefinition> {
        let mut definition = self.get_task_definition(id)?;
        definition.set_title(input.title.clone());
        definition.set_offsets(input.start_offset_in_days, input.finish_offset_in_days);
        definition.set_description(input.description.clone());
        self.task_definitions.update_task_definition(&definition)?;
        Ok(definition)
    }

    pub fn get_task_definition(&self, id: TaskDefinitionId) -> ServiceResult<TaskDefinition> {
        self.task_definitions
            .get_task_definition(id)?
            .ok_or(ServiceError::NotFound {
                kind: EntityKind::TaskDefinition,
                id,
            })
    }

    /// Detaches a task definition from one event type. The definition stays.
    pub fn remove_task_definition(
        &self,
        event_type_id: EventTypeId,
        task_definition_id: TaskDefinitionId,
    ) -> ServiceResult<bool> {
        let changed = logged(
            "task_definition_detach",
            event_type_id,
            self.try_remove_task_definition(event_type_id, task_definition_id),
        )?;
        info!(
            "event=task_definition_detach module=service status=ok id={event_type_id} task_definition_id={task_definition_id} changed={changed}"
        );
        Ok(changed)
    }

    fn try_remove_task_definition(
        &self,
        event_type_id: EventTypeId,
        task_definition_id: TaskDefinitionId,
    ) -> ServiceResult<bool> {
        let mut event_type = self.get_event_type(event_type_id)?;
        let changed = event_type.remove_task_definition(task_definition_id);
        if changed {
            self.event_types.update_event_type(&event_type)?;
        }
        Ok(changed)
    }

    /// Replaces the task definitions of an event type from comma separated
    /// ids. Every id must resolve.
    pub fn replace_task_definitions(
        &self,
        event_type_id: EventTypeId,
        csv: &str,
    ) -> ServiceResult<EventType> {
        let event_type = logged(
            "task_definition_replace",
            event_type_id,
            self.try_replace_task_definitions(event_type_id, csv),
        )?;
        info!(
            "event=task_definition_replace module=service status=ok id={event_type_id} count={}",
            event_type.task_definition_ids().len()
        );
        Ok(event_type)
    }

    fn try_replace_task_definitions(
        &self,
        event_type_id: EventTypeId,
        csv: &str,
    ) -> ServiceResult<EventType> {
        let mut event_type = self.get_event_type(event_type_id)?;
        event_type.set_task_definitions_csv(csv)?;
        event_type.task_definitions(&self.task_definitions)?;
        self.event_types.update_event_type(&event_type)?;
        Ok(event_type)
    }

    /// Hard-deletes a task definition after detaching it from every event
    /// type (deleted ones included). Returns the detached event type ids.
    ///
    /// The detach writes and the delete commit together or not at all.
    pub fn delete_task_definition(&self, id: TaskDefinitionId) -> ServiceResult<Vec<EventTypeId>> {
        let detached = logged("task_definition_delete", id, self.try_delete_task_definition(id))?;
        info!(
            "event=task_definition_delete module=service status=ok task_definition_id={id} detached={}",
            detached.len()
        );
        Ok(detached)
    }

    fn try_delete_task_definition(&self, id: TaskDefinitionId) -> ServiceResult<Vec<EventTypeId>> {
        self.get_task_definition(id)?;

        self.event_types.atomically(|| {
            let mut detached = Vec::new();
            for mut event_type in self.event_types.list_event_types(&ListQuery::all())? {
                if event_type.remove_task_definition(id) {
                    self.event_types.update_event_type(&event_type)?;
                    detached.push(event_type.id());
                }
            }

            self.task_definitions.delete_task_definition(id)?;
            Ok(detached)
        })
    }
}
