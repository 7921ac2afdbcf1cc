//! Event repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Event::validate()` before SQL mutations.
//! - Attached event type ids are stored as comma separated text.
//! - `update_event` never writes lifecycle state.

use crate::model::event::{Event, EventRecord};
use crate::model::ids::{EntityKind, EventId};
use crate::model::lifecycle::PublishState;
use crate::repo::{
    ensure_connection_ready, parse_id_column, parse_state, run_immediate, transition_state,
    ListQuery, RepoError, RepoResult, WriteScope,
};
use rusqlite::{params, Connection, Row};

const TABLE: &str = "events";

const EVENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    location,
    start_time,
    end_time,
    event_type_ids,
    state
FROM events";

/// Repository interface for event persistence.
pub trait EventRepository: WriteScope {
    /// Allocates a new draft event with an empty zero-length window.
    fn create_event(&self) -> RepoResult<Event>;
    /// Writes details and attached event type ids of an existing event.
    fn update_event(&self, event: &Event) -> RepoResult<()>;
    /// Gets one event by id, soft-deleted rows included.
    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>>;
    /// Lists events ordered by start time, then id.
    fn list_events(&self, query: &ListQuery) -> RepoResult<Vec<Event>>;
    fn publish_event(&self, id: EventId) -> RepoResult<PublishState>;
    fn soft_delete_event(&self, id: EventId) -> RepoResult<PublishState>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    /// Creates a repository after verifying the connection is migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[TABLE])?;
        Ok(Self { conn })
    }
}

impl WriteScope for SqliteEventRepository<'_> {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        run_immediate(self.conn, work)
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create_event(&self) -> RepoResult<Event> {
        self.conn.execute("INSERT INTO events DEFAULT VALUES;", [])?;
        Ok(Event::new(self.conn.last_insert_rowid()))
    }

    fn update_event(&self, event: &Event) -> RepoResult<()> {
        event.validate()?;

        let changed = self.conn.execute(
            "UPDATE events
             SET
                name = ?1,
                location = ?2,
                start_time = ?3,
                end_time = ?4,
                event_type_ids = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?6;",
            params![
                event.name(),
                event.location(),
                event.start_time(),
                event.end_time(),
                event.event_type_ids_csv(),
                event.id(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Event,
                id: event.id(),
            });
        }

        Ok(())
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }

        Ok(None)
    }

    fn list_events(&self, query: &ListQuery) -> RepoResult<Vec<Event>> {
        let sql = format!(
            "{EVENT_SELECT_SQL} WHERE {} ORDER BY start_time ASC, id ASC;",
            query.state_filter()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut events = Vec::new();

        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }

        Ok(events)
    }

    fn publish_event(&self, id: EventId) -> RepoResult<PublishState> {
        transition_state(self.conn, TABLE, EntityKind::Event, id, |state| {
            state.publish()
        })
    }

    fn soft_delete_event(&self, id: EventId) -> RepoResult<PublishState> {
        transition_state(self.conn, TABLE, EntityKind::Event, id, |state| {
            state.soft_delete();
            Ok(())
        })
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let id: EventId = row.get("id")?;
    let event_type_ids: String = row.get("event_type_ids")?;
    let state: String = row.get("state")?;

    let record = EventRecord {
        id,
        name: row.get("name")?,
        location: row.get("location")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        event_type_ids: parse_id_column(&event_type_ids, TABLE, "event_type_ids", id)?,
        state: parse_state(&state, TABLE, id)?,
    };

    Event::try_from(record)
        .map_err(|err| RepoError::InvalidData(format!("{TABLE} row {id}: {err}")))
}
