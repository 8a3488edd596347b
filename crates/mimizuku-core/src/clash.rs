//! Clash values: detected contradictions in the completion graph

use crate::deps::DependencySet;
use crate::term::{Concept, Iri, Role};
use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of contradiction that was detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClashKind {
    /// A concept and its negation on the same node
    Atomic(Concept),

    /// ⊥ asserted on a node
    Bottom,

    /// More role successors than a ≤n restriction allows, with no
    /// mergeable pair left
    MaxCardinality { role: Role, bound: u32 },

    /// Two individuals asserted distinct were merged
    MergedDistinct,

    /// A literal's restricted value space is unsatisfiable
    EmptyValueSpace(Iri),
}

impl fmt::Display for ClashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClashKind::Atomic(c) => write!(f, "{c} together with its negation"),
            ClashKind::Bottom => write!(f, "⊥"),
            ClashKind::MaxCardinality { role, bound } => {
                write!(f, "more than {bound} distinct {role}-successors")
            }
            ClashKind::MergedDistinct => write!(f, "merge of distinct individuals"),
            ClashKind::EmptyValueSpace(datatype) => {
                write!(f, "empty value space for {datatype}")
            }
        }
    }
}

/// A contradiction, carrying the branch choices that jointly caused it.
///
/// Backtracking consumes the dependency set and never looks at facts
/// outside it. An independent (empty) set means the contradiction holds
/// unconditionally and the whole check fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clash {
    pub node: NodeId,
    pub kind: ClashKind,
    pub deps: DependencySet,
}

impl Clash {
    pub fn new(node: NodeId, kind: ClashKind, deps: DependencySet) -> Self {
        Self { node, kind, deps }
    }

    pub fn atomic(node: NodeId, concept: Concept, deps: DependencySet) -> Self {
        Self::new(node, ClashKind::Atomic(concept), deps)
    }
}

impl fmt::Display for Clash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clash at {}: {} (depends on {})", self.node, self.kind, self.deps)
    }
}
