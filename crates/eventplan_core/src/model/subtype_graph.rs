//! Reachability algorithms over the event type subtype graph.
//!
//! # Responsibility
//! - Expose the graph as "node id -> direct subtype ids" so algorithms do
//!   not recurse through live objects.
//! - Provide the single reachability primitive behind every cycle guard and
//!   the order-preserving closure used for redundancy and checklists.
//!
//! # Invariants
//! - Traversals keep a visited set: shared subgraphs are walked once and a
//!   corrupted (cyclic) store cannot loop forever.
//! - A node the store cannot resolve fails the traversal with
//!   `RelationError::Unresolved`.

use crate::model::event_type::EventType;
use crate::model::ids::{EntityKind, EventTypeId};
use crate::model::relation::RelationError;
use crate::repo::event_type_repo::EventTypeRepository;
use std::collections::HashSet;

/// Directed "has subtype" adjacency.
pub trait SubtypeGraph {
    /// Direct subtype ids of `id`, in stored order.
    fn direct_subtypes(&self, id: EventTypeId) -> Result<Vec<EventTypeId>, RelationError>;
}

/// Graph backed by an event type repository. Deleted rows keep their edges.
pub struct StoredGraph<'r, R: ?Sized> {
    repo: &'r R,
}

impl<'r, R: EventTypeRepository + ?Sized> StoredGraph<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }
}

impl<R: EventTypeRepository + ?Sized> SubtypeGraph for StoredGraph<'_, R> {
    fn direct_subtypes(&self, id: EventTypeId) -> Result<Vec<EventTypeId>, RelationError> {
        let event_type = self
            .repo
            .get_event_type(id)?
            .ok_or(RelationError::Unresolved {
                kind: EntityKind::EventType,
                id,
            })?;
        Ok(event_type.subtype_ids().to_vec())
    }
}

/// Graph where one in-memory event type replaces its stored row.
///
/// Lets unsaved edits of the value being inspected take part in checks.
pub struct ShadowedGraph<'a, G: ?Sized> {
    base: &'a G,
    shadow: &'a EventType,
}

impl<'a, G: SubtypeGraph + ?Sized> ShadowedGraph<'a, G> {
    pub fn new(base: &'a G, shadow: &'a EventType) -> Self {
        Self { base, shadow }
    }
}

impl<G: SubtypeGraph + ?Sized> SubtypeGraph for ShadowedGraph<'_, G> {
    fn direct_subtypes(&self, id: EventTypeId) -> Result<Vec<EventTypeId>, RelationError> {
        if id == self.shadow.id() {
            return Ok(self.shadow.subtype_ids().to_vec());
        }
        self.base.direct_subtypes(id)
    }
}

/// Returns whether `target` is a transitive subtype of `from`.
///
/// Depth-first, O(V+E). `from` itself only counts when a path leads back
/// to it.
pub fn reaches<G: SubtypeGraph + ?Sized>(
    graph: &G,
    from: EventTypeId,
    target: EventTypeId,
) -> Result<bool, RelationError> {
    let mut visited = HashSet::new();
    let mut stack = graph.direct_subtypes(from)?;
    while let Some(current) = stack.pop() {
        if current == target {
            return Ok(true);
        }
        if !visited.insert(current) {
            continue;
        }
        stack.extend(graph.direct_subtypes(current)?);
    }
    Ok(false)
}

/// Returns `roots` and every transitive subtype of them, without repeats.
///
/// Order is depth-first pre-order following stored edge order, so the
/// result is stable for an unchanged graph.
pub fn closure<G: SubtypeGraph + ?Sized>(
    graph: &G,
    roots: &[EventTypeId],
) -> Result<Vec<EventTypeId>, RelationError> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack: Vec<EventTypeId> = roots.iter().rev().copied().collect();
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        order.push(current);
        let children = graph.direct_subtypes(current)?;
        stack.extend(children.into_iter().rev());
    }
    Ok(order)
}
