//! Service-level error type.
//!
//! Flattens repository failures into caller-facing categories so a
//! transport layer can map them without inspecting nested enums.

use crate::model::event::EventValidationError;
use crate::model::ids::EntityKind;
use crate::model::lifecycle::LifecycleError;
use crate::model::relation::RelationError;
use crate::model::task_definition::TaskDefinitionError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from event planning use cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Point lookup miss on the entity the use case targets.
    NotFound { kind: EntityKind, id: i64 },
    /// Rejected relation mutation or dangling reference.
    Relation(RelationError),
    InvalidTaskDefinition(TaskDefinitionError),
    InvalidEvent(EventValidationError),
    Lifecycle(LifecycleError),
    /// Storage failure.
    Repo(RepoError),
}

impl ServiceError {
    /// Stable metadata code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Relation(RelationError::CycleDetected { .. }) => "cycle_detected",
            Self::Relation(RelationError::DuplicateEdge { .. }) => "duplicate_edge",
            Self::Relation(RelationError::DuplicateEventType { .. }) => "duplicate",
            Self::Relation(RelationError::IdList(_)) => "invalid_id_list",
            Self::Relation(RelationError::Unresolved { .. }) => "unresolved_reference",
            Self::Relation(RelationError::Repo(_)) | Self::Repo(_) => "storage_error",
            Self::InvalidTaskDefinition(_) => "invalid_task_definition",
            Self::InvalidEvent(_) => "invalid_event",
            Self::Lifecycle(_) => "invalid_transition",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Relation(err) => write!(f, "{err}"),
            Self::InvalidTaskDefinition(err) => write!(f, "{err}"),
            Self::InvalidEvent(err) => write!(f, "{err}"),
            Self::Lifecycle(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound { .. } => None,
            Self::Relation(err) => Some(err),
            Self::InvalidTaskDefinition(err) => Some(err),
            Self::InvalidEvent(err) => Some(err),
            Self::Lifecycle(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            RepoError::InvalidTaskDefinition(err) => Self::InvalidTaskDefinition(err),
            RepoError::InvalidEvent(err) => Self::InvalidEvent(err),
            RepoError::Lifecycle(err) => Self::Lifecycle(err),
            other => Self::Repo(other),
        }
    }
}

impl From<RelationError> for ServiceError {
    fn from(value: RelationError) -> Self {
        match value {
            RelationError::Repo(err) => Self::from(err),
            other => Self::Relation(other),
        }
    }
}

impl From<TaskDefinitionError> for ServiceError {
    fn from(value: TaskDefinitionError) -> Self {
        Self::InvalidTaskDefinition(value)
    }
}

impl From<EventValidationError> for ServiceError {
    fn from(value: EventValidationError) -> Self {
        Self::InvalidEvent(value)
    }
}

impl From<LifecycleError> for ServiceError {
    fn from(value: LifecycleError) -> Self {
        Self::Lifecycle(value)
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceError;
    use crate::model::ids::EntityKind;
    use crate::model::relation::RelationError;
    use crate::repo::RepoError;

    #[test]
    fn repo_not_found_inside_relation_error_is_flattened() {
        let err = ServiceError::from(RelationError::Repo(RepoError::NotFound {
            kind: EntityKind::Event,
            id: 4,
        }));
        assert!(matches!(
            err,
            ServiceError::NotFound {
                kind: EntityKind::Event,
                id: 4
            }
        ));
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn relation_codes_are_specific() {
        let err = ServiceError::from(RelationError::CycleDetected {
            parent: 1,
            subtype: 1,
        });
        assert_eq!(err.code(), "cycle_detected");
    }
}
