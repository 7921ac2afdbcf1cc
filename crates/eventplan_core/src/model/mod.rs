//! Event planning domain model.
//!
//! # Responsibility
//! - Define task definitions, event types and events.
//! - Own the invariant-preserving relation algorithms (cycle checks,
//!   recursive closures, redundancy filtering).
//!
//! # Invariants
//! - The event type subtype graph is acyclic at all times.
//! - Model mutations never persist; callers write through `repo`.
//! - Deletion is represented by `PublishState::Deleted`, not hard delete
//!   (task definitions excepted).

pub mod checklist;
pub mod event;
pub mod event_type;
pub mod ids;
pub mod lifecycle;
pub mod relation;
pub mod subtype_graph;
pub mod task_definition;
