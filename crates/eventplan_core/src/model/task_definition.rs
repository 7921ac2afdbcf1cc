//! Task definition domain model.
//!
//! # Responsibility
//! - Describe one reusable task template scheduled relative to an event
//!   start date.
//!
//! # Invariants
//! - `id` is `None` until persisted and never changes once assigned.
//! - Offsets count whole days before the event start.
//! - Title and description respect storage bounds (see `validate`).

use crate::model::ids::TaskDefinitionId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 55;
/// Maximum rich text description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 16_777_215;

/// Validation and identity errors for task definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDefinitionError {
    BlankTitle,
    TitleTooLong { chars: usize },
    DescriptionTooLong { chars: usize },
    /// An id was already assigned; ids are immutable.
    IdAlreadyAssigned { current: TaskDefinitionId },
    /// Operation requires a persisted task definition.
    Unassigned,
}

impl Display for TaskDefinitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "task definition title must not be blank"),
            Self::TitleTooLong { chars } => write!(
                f,
                "task definition title has {chars} characters, maximum is {MAX_TITLE_CHARS}"
            ),
            Self::DescriptionTooLong { chars } => write!(
                f,
                "task definition description has {chars} characters, maximum is {MAX_DESCRIPTION_CHARS}"
            ),
            Self::IdAlreadyAssigned { current } => {
                write!(f, "task definition already has id {current}")
            }
            Self::Unassigned => write!(f, "task definition has no id yet"),
        }
    }
}

impl Error for TaskDefinitionError {}

/// Template for one actionable task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    id: Option<TaskDefinitionId>,
    title: String,
    start_offset_in_days: u32,
    finish_offset_in_days: u32,
    description: String,
}

impl TaskDefinition {
    /// Creates a transient (unpersisted) task definition.
    pub fn new(
        title: impl Into<String>,
        start_offset_in_days: u32,
        finish_offset_in_days: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            start_offset_in_days,
            finish_offset_in_days,
            description: description.into(),
        }
    }

    /// Assigns the storage id. Fails if one is already set.
    pub fn assign_id(&mut self, id: TaskDefinitionId) -> Result<(), TaskDefinitionError> {
        if let Some(current) = self.id {
            return Err(TaskDefinitionError::IdAlreadyAssigned { current });
        }
        self.id = Some(id);
        Ok(())
    }

    pub fn id(&self) -> Option<TaskDefinitionId> {
        self.id
    }

    /// Returns the id or `Unassigned` for transient values.
    pub fn require_id(&self) -> Result<TaskDefinitionId, TaskDefinitionError> {
        self.id.ok_or(TaskDefinitionError::Unassigned)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Days before the event start when work should begin.
    pub fn start_offset_in_days(&self) -> u32 {
        self.start_offset_in_days
    }

    /// Days before the event start when the task is due.
    pub fn finish_offset_in_days(&self) -> u32 {
        self.finish_offset_in_days
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_offsets(&mut self, start_offset_in_days: u32, finish_offset_in_days: u32) {
        self.start_offset_in_days = start_offset_in_days;
        self.finish_offset_in_days = finish_offset_in_days;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Checks storage bounds.
    pub fn validate(&self) -> Result<(), TaskDefinitionError> {
        if self.title.trim().is_empty() {
            return Err(TaskDefinitionError::BlankTitle);
        }
        let title_chars = self.title.chars().count();
        if title_chars > MAX_TITLE_CHARS {
            return Err(TaskDefinitionError::TitleTooLong { chars: title_chars });
        }
        let description_chars = self.description.chars().count();
        if description_chars > MAX_DESCRIPTION_CHARS {
            return Err(TaskDefinitionError::DescriptionTooLong {
                chars: description_chars,
            });
        }
        Ok(())
    }
}
