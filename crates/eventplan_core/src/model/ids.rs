//! Identifier aliases and the comma separated id list codec.
//!
//! # Responsibility
//! - Name the integer row ids used by every entity.
//! - Parse and format id lists (`"1,2,4,5"` or `""`) for bulk setters and
//!   persisted relation columns.
//!
//! # Invariants
//! - A parsed id list never contains the same id twice.
//! - `format_id_list(parse_id_list(s)?)` keeps the input order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage row id of an event type.
pub type EventTypeId = i64;
/// Storage row id of a task definition.
pub type TaskDefinitionId = i64;
/// Storage row id of an event.
pub type EventId = i64;

static ID_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid id token regex"));

/// Entity family an id belongs to. Used to qualify lookup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    EventType,
    TaskDefinition,
    Event,
}

impl EntityKind {
    /// Stable lowercase name used in messages and log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventType => "event_type",
            Self::TaskDefinition => "task_definition",
            Self::Event => "event",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from bulk id list input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdListError {
    /// A token is not a non-negative integer.
    Parse(String),
    /// The same id appears more than once.
    DuplicateIds(i64),
}

impl Display for IdListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(token) => write!(f, "invalid id `{token}` in id list"),
            Self::DuplicateIds(id) => write!(f, "duplicate id {id} in id list"),
        }
    }
}

impl Error for IdListError {}

/// Parses a comma separated id list.
///
/// Blank input yields an empty list. Tokens are trimmed; empty tokens
/// (`"1,,2"`) are parse errors.
pub fn parse_id_list(input: &str) -> Result<Vec<i64>, IdListError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    for raw in trimmed.split(',') {
        let token = raw.trim();
        if !ID_TOKEN_RE.is_match(token) {
            return Err(IdListError::Parse(token.to_string()));
        }
        let id = token
            .parse::<i64>()
            .map_err(|_| IdListError::Parse(token.to_string()))?;
        ids.push(id);
    }

    ensure_unique_ids(&ids)?;
    Ok(ids)
}

/// Formats ids as the comma separated form accepted by `parse_id_list`.
pub fn format_id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Rejects a list that repeats any id, reporting the first repeat.
pub fn ensure_unique_ids(ids: &[i64]) -> Result<(), IdListError> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(*id) {
            return Err(IdListError::DuplicateIds(*id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{format_id_list, parse_id_list, IdListError};

    #[test]
    fn parse_keeps_input_order() {
        assert_eq!(parse_id_list("4,1,5,2").unwrap(), vec![4, 1, 5, 2]);
    }

    #[test]
    fn parse_blank_is_empty() {
        assert!(parse_id_list("").unwrap().is_empty());
        assert!(parse_id_list("   ").unwrap().is_empty());
    }

    #[test]
    fn parse_trims_tokens() {
        assert_eq!(parse_id_list(" 1, 2 ,3").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn parse_rejects_non_numeric_and_empty_tokens() {
        assert_eq!(
            parse_id_list("1,a,3").unwrap_err(),
            IdListError::Parse("a".to_string())
        );
        assert_eq!(
            parse_id_list("1,,3").unwrap_err(),
            IdListError::Parse(String::new())
        );
        assert_eq!(
            parse_id_list("-1").unwrap_err(),
            IdListError::Parse("-1".to_string())
        );
    }

    #[test]
    fn parse_rejects_overflowing_id() {
        let err = parse_id_list("99999999999999999999").unwrap_err();
        assert!(matches!(err, IdListError::Parse(_)));
    }

    #[test]
    fn parse_rejects_repeats() {
        assert_eq!(
            parse_id_list("1,1,2").unwrap_err(),
            IdListError::DuplicateIds(1)
        );
    }

    #[test]
    fn format_joins_with_commas() {
        assert_eq!(format_id_list(&[1, 2, 4, 5]), "1,2,4,5");
        assert_eq!(format_id_list(&[]), "");
    }
}
