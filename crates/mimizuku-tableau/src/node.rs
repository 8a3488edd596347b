//! Graph nodes: individuals and literal values

use crate::completion::RuleKind;
use indexmap::IndexMap;
use mimizuku_core::{Concept, DependencySet, Iri, Literal, NodeId, Role};
use std::fmt;

/// What a node stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeName {
    /// A named individual from the ABox
    Named(Iri),

    /// A fresh individual introduced by a generating rule
    Anonymous(u32),

    /// A concrete literal value
    Literal(Literal),

    /// A fresh literal introduced by a data-role existential
    AnonymousLiteral(u32),
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeName::Named(iri) => write!(f, "{iri}"),
            NodeName::Anonymous(n) => write!(f, "_:a{n}"),
            NodeName::Literal(lit) => write!(f, "{lit}"),
            NodeName::AnonymousLiteral(n) => write!(f, "_:v{n}"),
        }
    }
}

/// A typed, dependency-tagged edge to another node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub role: Role,
    pub to: NodeId,
    pub deps: DependencySet,
}

/// One individual (or literal) in the completion graph.
///
/// Types are kept in insertion order together with the dependency set
/// that justifies each of them; per rule kind, an obligation queue plus
/// an `apply_next` cursor records how far expansion has progressed so
/// re-entry never re-scans processed entries.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: NodeName,
    types: IndexMap<Concept, DependencySet>,
    queues: [Vec<Concept>; RuleKind::COUNT],
    pub apply_next: [usize; RuleKind::COUNT],
    out_edges: Vec<Edge>,
    in_edges: Vec<NodeId>,
    distincts: Vec<(NodeId, DependencySet)>,
    /// Redirect target once this node has been merged away
    pub merged_into: Option<NodeId>,
    /// Creating node, for anonymous successors (blocking ancestry)
    pub predecessor: Option<NodeId>,
    /// Generation depth below the named individuals
    pub depth: u32,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: NodeName, predecessor: Option<NodeId>, depth: u32) -> Self {
        Self {
            id,
            name,
            types: IndexMap::new(),
            queues: std::array::from_fn(|_| Vec::new()),
            apply_next: [0; RuleKind::COUNT],
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            distincts: Vec::new(),
            merged_into: None,
            predecessor,
            depth,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.name, NodeName::Anonymous(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.name,
            NodeName::Literal(_) | NodeName::AnonymousLiteral(_)
        )
    }

    pub fn is_merged(&self) -> bool {
        self.merged_into.is_some()
    }

    /// Concrete value, for literal nodes seeded from the ABox.
    pub fn literal_value(&self) -> Option<&Literal> {
        match &self.name {
            NodeName::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn has_type(&self, concept: &Concept) -> bool {
        self.types.contains_key(concept)
    }

    pub fn type_deps(&self, concept: &Concept) -> Option<&DependencySet> {
        self.types.get(concept)
    }

    /// Asserted types with their justifications, in insertion order.
    pub fn types(&self) -> impl Iterator<Item = (&Concept, &DependencySet)> {
        self.types.iter()
    }

    /// The type set alone, for blocking comparisons.
    pub fn type_set(&self) -> impl Iterator<Item = &Concept> {
        self.types.keys()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn queue(&self, kind: RuleKind) -> &[Concept] {
        &self.queues[kind.index()]
    }

    pub fn out_edges(&self) -> &[Edge] {
        &self.out_edges
    }

    pub fn distincts(&self) -> &[(NodeId, DependencySet)] {
        &self.distincts
    }

    // Mutators below are crate-private: every change must go through the
    // graph so it lands on the trail and reaches the network.

    pub(crate) fn insert_type(&mut self, concept: Concept, deps: DependencySet) {
        if let Some(kind) = RuleKind::of(&concept) {
            self.queues[kind.index()].push(concept.clone());
        }
        self.types.insert(concept, deps);
    }

    pub(crate) fn pop_type(&mut self, concept: &Concept) {
        let popped = self.types.pop();
        debug_assert_eq!(popped.as_ref().map(|(c, _)| c), Some(concept));
        if let Some(kind) = RuleKind::of(concept) {
            self.queues[kind.index()].pop();
        }
    }

    pub(crate) fn push_edge(&mut self, edge: Edge) {
        self.out_edges.push(edge);
    }

    pub(crate) fn pop_edge(&mut self) -> Option<Edge> {
        self.out_edges.pop()
    }

    pub(crate) fn push_in_edge(&mut self, from: NodeId) {
        self.in_edges.push(from);
    }

    pub(crate) fn pop_in_edge(&mut self) {
        self.in_edges.pop();
    }

    pub(crate) fn in_edges(&self) -> &[NodeId] {
        &self.in_edges
    }

    pub(crate) fn push_distinct(&mut self, other: NodeId, deps: DependencySet) {
        self.distincts.push((other, deps));
    }

    pub(crate) fn pop_distinct(&mut self) {
        self.distincts.pop();
    }
}
