//! Core domain logic for event planning templates.
//! This crate is the single source of truth for the event type hierarchy
//! invariants (acyclic subtypes, duplicate-free relations, checklist
//! derivation).

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::checklist::{derive_checklist, PlannedTask, SECONDS_PER_DAY};
pub use model::event::{Event, EventRecord, EventValidationError};
pub use model::event_type::{EventType, EventTypeRecord};
pub use model::ids::{
    format_id_list, parse_id_list, EntityKind, EventId, EventTypeId, IdListError,
    TaskDefinitionId,
};
pub use model::lifecycle::{LifecycleError, PublishState};
pub use model::relation::RelationError;
pub use model::task_definition::{TaskDefinition, TaskDefinitionError};
pub use repo::event_repo::{EventRepository, SqliteEventRepository};
pub use repo::event_type_repo::{EventTypeRepository, SqliteEventTypeRepository};
pub use repo::task_definition_repo::{SqliteTaskDefinitionRepository, TaskDefinitionRepository};
pub use repo::{ListQuery, RepoError, RepoResult, WriteScope};
pub use service::error::{ServiceError, ServiceResult};
pub use service::event_service::{EventDetails, EventService};
pub use service::event_type_service::{EventTypeService, TaskDefinitionInput};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
