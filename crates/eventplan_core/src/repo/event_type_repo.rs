//! Event type repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist event types with their subtype and task definition id lists.
//! - Keep SQL details inside core persistence boundary.
//!
//! # Invariants
//! - Id lists are stored as comma separated text (`""` for empty).
//! - `update_event_type` never writes lifecycle state; transitions go
//!   through `publish_event_type` / `soft_delete_event_type`.
//! - `get_event_type` returns soft-deleted rows; listings filter them.

use crate::model::event_type::{EventType, EventTypeRecord};
use crate::model::ids::{EntityKind, EventTypeId};
use crate::model::lifecycle::PublishState;
use crate::repo::{
    ensure_connection_ready, parse_id_column, parse_state, run_immediate, transition_state,
    ListQuery, RepoError, RepoResult, WriteScope,
};
use rusqlite::{params, Connection, Row};

const TABLE: &str = "event_types";

const EVENT_TYPE_SELECT_SQL: &str = "SELECT
    id,
    display_name,
    description,
    subtype_ids,
    task_definition_ids,
    state
FROM event_types";

/// Repository interface for event type persistence.
pub trait EventTypeRepository: WriteScope {
    /// Allocates a new draft event type with empty relations.
    fn create_event_type(&self) -> RepoResult<EventType>;
    /// Writes details and relation id lists of an existing event type.
    fn update_event_type(&self, event_type: &EventType) -> RepoResult<()>;
    /// Gets one event type by id, soft-deleted rows included.
    fn get_event_type(&self, id: EventTypeId) -> RepoResult<Option<EventType>>;
    /// Lists event types in id order.
    fn list_event_types(&self, query: &ListQuery) -> RepoResult<Vec<EventType>>;
    /// Moves an event type to `Published`.
    fn publish_event_type(&self, id: EventTypeId) -> RepoResult<PublishState>;
    /// Soft-deletes an event type.
    fn soft_delete_event_type(&self, id: EventTypeId) -> RepoResult<PublishState>;
}

/// SQLite-backed event type repository.
pub struct SqliteEventTypeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventTypeRepository<'conn> {
    /// Creates a repository after verifying the connection is migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[TABLE])?;
        Ok(Self { conn })
    }
}

impl WriteScope for SqliteEventTypeRepository<'_> {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        run_immediate(self.conn, work)
    }
}

impl EventTypeRepository for SqliteEventTypeRepository<'_> {
    fn create_event_type(&self) -> RepoResult<EventType> {
        self.conn.execute("INSERT INTO event_types DEFAULT VALUES;", [])?;
        Ok(EventType::new(self.conn.last_insert_rowid()))
    }

    fn update_event_type(&self, event_type: &EventType) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE event_types
             SET
                display_name = ?1,
                description = ?2,
                subtype_ids = ?3,
                task_definition_ids = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?5;",
            params![
                event_type.display_name(),
                event_type.description(),
                event_type.subtype_ids_csv(),
                event_type.task_definition_ids_csv(),
                event_type.id(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::EventType,
                id: event_type.id(),
            });
        }

        Ok(())
    }

    fn get_event_type(&self, id: EventTypeId) -> RepoResult<Option<EventType>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_TYPE_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_type_row(row)?));
        }

        Ok(None)
    }

    fn list_event_types(&self, query: &ListQuery) -> RepoResult<Vec<EventType>> {
        let sql = format!(
            "{EVENT_TYPE_SELECT_SQL} WHERE {} ORDER BY id ASC;",
            query.state_filter()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut event_types = Vec::new();

        while let Some(row) = rows.next()? {
            event_types.push(parse_event_type_row(row)?);
        }

        Ok(event_types)
    }

    fn publish_event_type(&self, id: EventTypeId) -> RepoResult<PublishState> {
        transition_state(self.conn, TABLE, EntityKind::EventType, id, |state| {
            state.publish()
        })
    }

    fn soft_delete_event_type(&self, id: EventTypeId) -> RepoResult<PublishState> {
        transition_state(self.conn, TABLE, EntityKind::EventType, id, |state| {
            state.soft_delete();
            Ok(())
        })
    }
}

fn parse_event_type_row(row: &Row<'_>) -> RepoResult<EventType> {
    let id: EventTypeId = row.get("id")?;
    let subtype_ids: String = row.get("subtype_ids")?;
    let task_definition_ids: String = row.get("task_definition_ids")?;
    let state: String = row.get("state")?;

    let record = EventTypeRecord {
        id,
        display_name: row.get("display_name")?,
        description: row.get("description")?,
        subtype_ids: parse_id_column(&subtype_ids, TABLE, "subtype_ids", id)?,
        task_definition_ids: parse_id_column(
            &task_definition_ids,
            TABLE,
            "task_definition_ids",
            id,
        )?,
        state: parse_state(&state, TABLE, id)?,
    };

    EventType::try_from(record)
        .map_err(|err| RepoError::InvalidData(format!("{TABLE} row {id}: {err}")))
}
