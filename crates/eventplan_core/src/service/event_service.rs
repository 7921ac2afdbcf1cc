//! Event use-case service.
//!
//! # Responsibility
//! - Orchestrate event details, lifecycle and event type attachment.
//! - Derive the task checklist of an event.
//!
//! # Invariants
//! - Details are validated before any row is allocated or written.
//! - Attachment rejects exact duplicates only; redundancy is filtered by
//!   `addable_event_types`.

use crate::model::checklist::{derive_checklist, PlannedTask};
use crate::model::event::Event;
use crate::model::event_type::EventType;
use crate::model::ids::{EntityKind, EventId, EventTypeId};
use crate::model::lifecycle::PublishState;
use crate::repo::event_repo::EventRepository;
use crate::repo::event_type_repo::EventTypeRepository;
use crate::repo::task_definition_repo::TaskDefinitionRepository;
use crate::repo::{ListQuery, WriteScope};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::logged;
use log::info;

/// Editable event fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDetails {
    pub name: String,
    pub location: String,
    /// Unix seconds.
    pub start_time: i64,
    /// Unix seconds.
    pub end_time: i64,
}

impl EventDetails {
    fn apply_to(&self, event: &mut Event) {
        event.set_name(self.name.clone());
        event.set_location(self.location.clone());
        event.set_time_window(self.start_time, self.end_time);
    }
}

/// Use-case service for events.
pub struct EventService<V, E, T>
where
    V: EventRepository,
    E: EventTypeRepository,
    T: TaskDefinitionRepository,
{
    events: V,
    event_types: E,
    task_definitions: T,
}

impl<V, E, T> EventService<V, E, T>
where
    V: EventRepository,
    E: EventTypeRepository,
    T: TaskDefinitionRepository,
{
    pub fn new(events: V, event_types: E, task_definitions: T) -> Self {
        Self {
            events,
            event_types,
            task_definitions,
        }
    }

    /// Creates a draft event.
    ///
    /// # Errors
    /// - `InvalidEvent` when `end_time < start_time`; no row is created.
    pub fn create_event(&self, details: &EventDetails) -> ServiceResult<Event> {
        let mut candidate = Event::new(0);
        details.apply_to(&mut candidate);
        logged("event_create", 0, candidate.validate().map_err(Into::into))?;

        let event = logged(
            "event_create",
            0,
            self.events.atomically(|| {
                let mut event = self.events.create_event()?;
                details.apply_to(&mut event);
                self.events.update_event(&event)?;
                Ok(event)
            }),
        )?;

        info!("event=event_create module=service status=ok id={}", event.id());
        Ok(event)
    }

    /// Gets one event, soft-deleted included.
    pub fn get_event(&self, id: EventId) -> ServiceResult<Event> {
        self.events.get_event(id)?.ok_or(ServiceError::NotFound {
            kind: EntityKind::Event,
            id,
        })
    }

    pub fn list_events(&self, query: &ListQuery) -> ServiceResult<Vec<Event>> {
        Ok(self.events.list_events(query)?)
    }

    pub fn update_details(&self, id: EventId, details: &EventDetails) -> ServiceResult<Event> {
        let event = logged("event_update", id, self.try_update_details(id, details))?;
        info!("event=event_update module=service status=ok id={id}");
        Ok(event)
    }

    fn try_update_details(&self, id: EventId, details: &EventDetails) -> ServiceResult<Event> {
        let mut event = self.get_event(id)?;
        details.apply_to(&mut event);
        self.events.update_event(&event)?;
        Ok(event)
    }

    pub fn publish_event(&self, id: EventId) -> ServiceResult<PublishState> {
        let state = logged(
            "event_publish",
            id,
            self.events.publish_event(id).map_err(Into::into),
        )?;
        info!("event=event_publish module=service status=ok id={id}");
        Ok(state)
    }

    pub fn delete_event(&self, id: EventId) -> ServiceResult<()> {
        logged(
            "event_delete",
            id,
            self.events.soft_delete_event(id).map_err(Into::into),
        )?;
        info!("event=event_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Attaches an event type and persists the event.
    ///
    /// # Errors
    /// - `NotFound` when the event or event type is missing.
    /// - `Relation(DuplicateEventType)` when it is already attached.
    pub fn attach_event_type(
        &self,
        event_id: EventId,
        event_type_id: EventTypeId,
    ) -> ServiceResult<Event> {
        let event = logged(
            "event_type_attach",
            event_id,
            self.try_attach_event_type(event_id, event_type_id),
        )?;
        info!(
            "event=event_type_attach module=service status=ok id={event_id} event_type_id={event_type_id}"
        );
        Ok(event)
    }

    fn try_attach_event_type(
        &self,
        event_id: EventId,
        event_type_id: EventTypeId,
    ) -> ServiceResult<Event> {
        let mut event = self.get_event(event_id)?;
        let event_type = self
            .event_types
            .get_event_type(event_type_id)?
            .ok_or(ServiceError::NotFound {
                kind: EntityKind::EventType,
                id: event_type_id,
            })?;
        event.add_event_type(&event_type)?;
        self.events.update_event(&event)?;
        Ok(event)
    }

    /// Detaches an event type. Returns whether the event changed.
    pub fn detach_event_type(
        &self,
        event_id: EventId,
        event_type_id: EventTypeId,
    ) -> ServiceResult<bool> {
        let changed = logged(
            "event_type_detach",
            event_id,
            self.try_detach_event_type(event_id, event_type_id),
        )?;
        info!(
            "event=event_type_detach module=service status=ok id={event_id} event_type_id={event_type_id} changed={changed}"
        );
        Ok(changed)
    }

    fn try_detach_event_type(
        &self,
        event_id: EventId,
        event_type_id: EventTypeId,
    ) -> ServiceResult<bool> {
        let mut event = self.get_event(event_id)?;
        let changed = event.remove_event_type(event_type_id);
        if changed {
            self.events.update_event(&event)?;
        }
        Ok(changed)
    }

    /// Replaces attached event types from comma separated ids. Every id
    /// must resolve.
    pub fn replace_event_types(&self, event_id: EventId, csv: &str) -> ServiceResult<Event> {
        let event = logged(
            "event_type_replace",
            event_id,
            self.try_replace_event_types(event_id, csv),
        )?;
        info!(
            "event=event_type_replace module=service status=ok id={event_id} count={}",
            event.event_type_ids().len()
        );
        Ok(event)
    }

    fn try_replace_event_types(&self, event_id: EventId, csv: &str) -> ServiceResult<Event> {
        let mut event = self.get_event(event_id)?;
        event.set_event_types_csv(csv)?;
        event.event_types(&self.event_types)?;
        self.events.update_event(&event)?;
        Ok(event)
    }

    /// Resolved event types attached to an event.
    pub fn event_types(&self, event_id: EventId) -> ServiceResult<Vec<EventType>> {
        let mut event = self.get_event(event_id)?;
        Ok(event.event_types(&self.event_types)?.to_vec())
    }

    /// Catalogue event types that can be attached without redundancy.
    pub fn addable_event_types(&self, event_id: EventId) -> ServiceResult<Vec<EventType>> {
        let mut event = self.get_event(event_id)?;
        Ok(event.addable_event_types(&self.event_types)?)
    }

    /// Dated task checklist of an event.
    pub fn checklist(&self, event_id: EventId) -> ServiceResult<Vec<PlannedTask>> {
        let event = self.get_event(event_id)?;
        Ok(derive_checklist(
            &event,
            &self.event_types,
            &self.task_definitions,
        )?)
    }
}
