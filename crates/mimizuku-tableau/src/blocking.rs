//! Blocking: suspending expansion of nodes subsumed by an ancestor
//!
//! Blocking never raises a clash; it only suppresses dispatch of
//! generating obligations on blocked nodes so cyclic models terminate.

use crate::graph::NodeGraph;
use crate::node::Node;
use mimizuku_core::NodeId;
use std::fmt;

/// The candidate/blocker pair a condition is evaluated over.
pub struct BlockingContext<'a> {
    pub blocked: &'a Node,
    pub blocker: &'a Node,
}

/// A pluggable predicate deciding whether `blocked` may suspend its
/// expansion because `blocker` already covers it.
pub trait BlockingCondition: fmt::Debug {
    fn name(&self) -> &'static str;

    fn is_blocked(&self, cx: &BlockingContext<'_>) -> bool;
}

/// Subset blocking: the candidate's type set is a subset of the
/// blocker's. Sound because any model satisfying the blocker's
/// obligations also satisfies the candidate's.
#[derive(Debug, Default)]
pub struct SubsetBlocking;

impl BlockingCondition for SubsetBlocking {
    fn name(&self) -> &'static str {
        "subset"
    }

    fn is_blocked(&self, cx: &BlockingContext<'_>) -> bool {
        cx.blocked.type_set().all(|c| cx.blocker.has_type(c))
    }
}

/// Equality blocking: both type sets must coincide. Stricter than
/// subset blocking, for profiles where subset blocking is too eager.
#[derive(Debug, Default)]
pub struct EqualityBlocking;

impl BlockingCondition for EqualityBlocking {
    fn name(&self) -> &'static str {
        "equality"
    }

    fn is_blocked(&self, cx: &BlockingContext<'_>) -> bool {
        cx.blocked.type_count() == cx.blocker.type_count()
            && cx.blocked.type_set().all(|c| cx.blocker.has_type(c))
    }
}

/// The nearest ancestor blocking `node` directly, if any. Only
/// anonymous nodes can be blocked; blockers are found along the
/// predecessor chain.
pub fn find_blocker(
    graph: &NodeGraph,
    condition: &dyn BlockingCondition,
    node: NodeId,
) -> Option<NodeId> {
    let blocked = graph.node(graph.deref(node));
    if !blocked.is_anonymous() {
        return None;
    }
    let mut current = blocked.predecessor;
    while let Some(ancestor_id) = current {
        let ancestor = graph.node(graph.deref(ancestor_id));
        if ancestor.is_literal() {
            return None;
        }
        let cx = BlockingContext {
            blocked,
            blocker: ancestor,
        };
        if condition.is_blocked(&cx) {
            return Some(ancestor.id);
        }
        current = ancestor.predecessor;
    }
    None
}

/// Whether `node` is blocked, directly or through a blocked ancestor.
///
/// Computed on demand so any change to either type set is reflected at
/// the next dispatch step without an invalidation protocol.
pub fn is_blocked(graph: &NodeGraph, condition: &dyn BlockingCondition, node: NodeId) -> bool {
    let mut current = Some(graph.deref(node));
    while let Some(id) = current {
        let n = graph.node(id);
        if !n.is_anonymous() {
            return false;
        }
        if find_blocker(graph, condition, id).is_some() {
            return true;
        }
        current = n.predecessor.map(|p| graph.deref(p));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimizuku_core::{Concept, DependencySet, Iri};

    #[test]
    fn test_subset_blocking_blocks_subsumed_successor() {
        let mut graph = NodeGraph::new();
        let x = graph.ensure_named(&Iri::new("x"));
        let y = graph.create_anonymous(x);

        graph
            .add_type(x, &Concept::named("A"), DependencySet::independent())
            .unwrap();
        graph
            .add_type(x, &Concept::named("B"), DependencySet::independent())
            .unwrap();
        graph
            .add_type(y, &Concept::named("A"), DependencySet::independent())
            .unwrap();

        // named ancestor with a superset of y's types blocks y
        assert_eq!(find_blocker(&graph, &SubsetBlocking, y), Some(x));
        assert!(is_blocked(&graph, &SubsetBlocking, y));

        // the subset invariant: every type of the blocked node is on the blocker
        for concept in graph.node(y).type_set() {
            assert!(graph.node(x).has_type(concept));
        }
    }

    #[test]
    fn test_block_invalidated_by_new_type() {
        let mut graph = NodeGraph::new();
        let x = graph.ensure_named(&Iri::new("x"));
        let y = graph.create_anonymous(x);
        graph
            .add_type(x, &Concept::named("A"), DependencySet::independent())
            .unwrap();
        graph
            .add_type(y, &Concept::named("A"), DependencySet::independent())
            .unwrap();
        assert!(is_blocked(&graph, &SubsetBlocking, y));

        // y gains a type x lacks: the block dissolves on the next query
        graph
            .add_type(y, &Concept::named("C"), DependencySet::independent())
            .unwrap();
        assert!(!is_blocked(&graph, &SubsetBlocking, y));
    }

    #[test]
    fn test_named_nodes_are_never_blocked() {
        let mut graph = NodeGraph::new();
        let x = graph.ensure_named(&Iri::new("x"));
        assert!(!is_blocked(&graph, &SubsetBlocking, x));
    }

    #[test]
    fn test_indirect_blocking_through_blocked_ancestor() {
        let mut graph = NodeGraph::new();
        let x = graph.ensure_named(&Iri::new("x"));
        let y = graph.create_anonymous(x);
        let z = graph.create_anonymous(y);

        graph
            .add_type(x, &Concept::named("A"), DependencySet::independent())
            .unwrap();
        graph
            .add_type(y, &Concept::named("A"), DependencySet::independent())
            .unwrap();
        graph
            .add_type(z, &Concept::named("Z"), DependencySet::independent())
            .unwrap();

        // y is directly blocked by x; z has no blocker of its own but
        // hangs below y
        assert!(is_blocked(&graph, &SubsetBlocking, y));
        assert_eq!(find_blocker(&graph, &SubsetBlocking, z), None);
        assert!(is_blocked(&graph, &SubsetBlocking, z));
    }

    #[test]
    fn test_equality_blocking_is_stricter() {
        let mut graph = NodeGraph::new();
        let x = graph.ensure_named(&Iri::new("x"));
        let y = graph.create_anonymous(x);
        graph
            .add_type(x, &Concept::named("A"), DependencySet::independent())
            .unwrap();
        graph
            .add_type(x, &Concept::named("B"), DependencySet::independent())
            .unwrap();
        graph
            .add_type(y, &Concept::named("A"), DependencySet::independent())
            .unwrap();

        assert!(is_blocked(&graph, &SubsetBlocking, y));
        assert!(!is_blocked(&graph, &EqualityBlocking, y));
    }
}
