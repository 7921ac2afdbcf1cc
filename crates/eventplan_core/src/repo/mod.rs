//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must run entity validation before persistence.
//! - Read paths reject invalid persisted state (bad id lists, unknown
//!   lifecycle values, negative offsets) instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - `WriteScope::atomically` covers every repository built on the same
//!   connection; scopes do not nest.

pub mod event_repo;
pub mod event_type_repo;
pub mod task_definition_repo;

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::event::EventValidationError;
use crate::model::ids::{parse_id_list, EntityKind};
use crate::model::lifecycle::{LifecycleError, PublishState};
use crate::model::task_definition::TaskDefinitionError;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target row does not exist.
    NotFound { kind: EntityKind, id: i64 },
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
    /// Task definition rejected before write.
    InvalidTaskDefinition(TaskDefinitionError),
    /// Event rejected before write.
    InvalidEvent(EventValidationError),
    /// Lifecycle transition rejected.
    Lifecycle(LifecycleError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::InvalidTaskDefinition(err) => write!(f, "{err}"),
            Self::InvalidEvent(err) => write!(f, "{err}"),
            Self::Lifecycle(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidTaskDefinition(err) => Some(err),
            Self::InvalidEvent(err) => Some(err),
            Self::Lifecycle(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<TaskDefinitionError> for RepoError {
    fn from(value: TaskDefinitionError) -> Self {
        Self::InvalidTaskDefinition(value)
    }
}

impl From<EventValidationError> for RepoError {
    fn from(value: EventValidationError) -> Self {
        Self::InvalidEvent(value)
    }
}

impl From<LifecycleError> for RepoError {
    fn from(value: LifecycleError) -> Self {
        Self::Lifecycle(value)
    }
}

/// Listing filter for lifecycle-managed entities.
///
/// The default lists published rows only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub include_drafts: bool,
    pub include_deleted: bool,
}

impl ListQuery {
    /// Lists every row regardless of state.
    pub fn all() -> Self {
        Self {
            include_drafts: true,
            include_deleted: true,
        }
    }

    pub(crate) fn admits(&self, state: PublishState) -> bool {
        match state {
            PublishState::Published => true,
            PublishState::Draft => self.include_drafts,
            PublishState::Deleted => self.include_deleted,
        }
    }

    /// SQL predicate on the `state` column.
    pub(crate) fn state_filter(&self) -> String {
        let states: Vec<String> = [
            PublishState::Published,
            PublishState::Draft,
            PublishState::Deleted,
        ]
        .into_iter()
        .filter(|state| self.admits(*state))
        .map(|state| format!("'{}'", state.as_str()))
        .collect();
        format!("state IN ({})", states.join(", "))
    }
}

/// Groups several repository writes into one unit.
pub trait WriteScope {
    /// Runs `work` inside one immediate transaction. Commits on `Ok`; any
    /// `Err` rolls back every write made through the shared connection.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>;
}

pub(crate) fn run_immediate<T, E, F>(conn: &Connection, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<RepoError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(RepoError::from)?;
    let value = work()?;
    tx.commit().map_err(RepoError::from)?;
    Ok(value)
}

pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn parse_state(value: &str, table: &str, id: i64) -> RepoResult<PublishState> {
    PublishState::parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid state `{value}` in {table} row {id}"))
    })
}

pub(crate) fn parse_id_column(
    value: &str,
    table: &str,
    column: &str,
    id: i64,
) -> RepoResult<Vec<i64>> {
    parse_id_list(value).map_err(|err| {
        RepoError::InvalidData(format!("{table}.{column} in row {id}: {err}"))
    })
}

/// Loads the stored state of one row, applies `transition` and writes it
/// back when it changed.
pub(crate) fn transition_state(
    conn: &Connection,
    table: &'static str,
    kind: EntityKind,
    id: i64,
    transition: impl FnOnce(&mut PublishState) -> Result<(), LifecycleError>,
) -> RepoResult<PublishState> {
    let stored: Option<String> = conn
        .query_row(
            &format!("SELECT state FROM {table} WHERE id = ?1;"),
            [id],
            |row| row.get(0),
        )
        .optional()?;
    let stored = stored.ok_or(RepoError::NotFound { kind, id })?;

    let current = parse_state(&stored, table, id)?;
    let mut next = current;
    transition(&mut next)?;

    if next != current {
        conn.execute(
            &format!(
                "UPDATE {table}
                 SET
                    state = ?1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?2;"
            ),
            params![next.as_str(), id],
        )?;
    }

    Ok(next)
}
