//! Task definition repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist reusable task templates.
//!
//! # Invariants
//! - Write paths call `TaskDefinition::validate()` before SQL mutations.
//! - Insert only accepts transient definitions; ids come from SQLite.
//! - Delete is a hard delete. Callers detach references first.

use crate::model::ids::{EntityKind, TaskDefinitionId};
use crate::model::task_definition::{TaskDefinition, TaskDefinitionError};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const TASK_DEFINITION_SELECT_SQL: &str = "SELECT
    id,
    title,
    start_offset_in_days,
    finish_offset_in_days,
    description
FROM task_definitions";

/// Repository interface for task definition persistence.
pub trait TaskDefinitionRepository {
    /// Inserts a transient definition and returns the allocated id.
    fn insert_task_definition(&self, definition: &TaskDefinition) -> RepoResult<TaskDefinitionId>;
    /// Writes all fields of a persisted definition.
    fn update_task_definition(&self, definition: &TaskDefinition) -> RepoResult<()>;
    fn get_task_definition(&self, id: TaskDefinitionId) -> RepoResult<Option<TaskDefinition>>;
    /// Lists all definitions in id order.
    fn list_task_definitions(&self) -> RepoResult<Vec<TaskDefinition>>;
    fn delete_task_definition(&self, id: TaskDefinitionId) -> RepoResult<()>;
}

/// SQLite-backed task definition repository.
pub struct SqliteTaskDefinitionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskDefinitionRepository<'conn> {
    /// Creates a repository after verifying the connection is migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["task_definitions"])?;
        Ok(Self { conn })
    }
}

impl TaskDefinitionRepository for SqliteTaskDefinitionRepository<'_> {
    fn insert_task_definition(&self, definition: &TaskDefinition) -> RepoResult<TaskDefinitionId> {
        if let Some(current) = definition.id() {
            return Err(TaskDefinitionError::IdAlreadyAssigned { current }.into());
        }
        definition.validate()?;

        self.conn.execute(
            "INSERT INTO task_definitions (
                title,
                start_offset_in_days,
                finish_offset_in_days,
                description
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                definition.title(),
                definition.start_offset_in_days(),
                definition.finish_offset_in_days(),
                definition.description(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_task_definition(&self, definition: &TaskDefinition) -> RepoResult<()> {
        let id = definition.require_id()?;
        definition.validate()?;

        let changed = self.conn.execute(
            "UPDATE task_definitions
             SET
                title = ?1,
                start_offset_in_days = ?2,
                finish_offset_in_days = ?3,
                description = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?5;",
            params![
                definition.title(),
                definition.start_offset_in_days(),
                definition.finish_offset_in_days(),
                definition.description(),
                id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::TaskDefinition,
                id,
            });
        }

        Ok(())
    }

    fn get_task_definition(&self, id: TaskDefinitionId) -> RepoResult<Option<TaskDefinition>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_DEFINITION_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_definition_row(row)?));
        }

        Ok(None)
    }

    fn list_task_definitions(&self) -> RepoResult<Vec<TaskDefinition>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_DEFINITION_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut definitions = Vec::new();

        while let Some(row) = rows.next()? {
            definitions.push(parse_task_definition_row(row)?);
        }

        Ok(definitions)
    }

    fn delete_task_definition(&self, id: TaskDefinitionId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM task_definitions WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::TaskDefinition,
                id,
            });
        }

        Ok(())
    }
}

fn parse_task_definition_row(row: &Row<'_>) -> RepoResult<TaskDefinition> {
    let id: TaskDefinitionId = row.get("id")?;
    let start_offset = parse_offset(row.get("start_offset_in_days")?, "start_offset_in_days", id)?;
    let finish_offset =
        parse_offset(row.get("finish_offset_in_days")?, "finish_offset_in_days", id)?;

    let mut definition = TaskDefinition::new(
        row.get::<_, String>("title")?,
        start_offset,
        finish_offset,
        row.get::<_, String>("description")?,
    );
    definition.assign_id(id)?;
    Ok(definition)
}

fn parse_offset(value: i64, column: &str, id: TaskDefinitionId) -> RepoResult<u32> {
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!(
            "task_definitions.{column} in row {id} out of range: {value}"
        ))
    })
}
