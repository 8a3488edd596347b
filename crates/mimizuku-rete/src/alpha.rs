//! Alpha memories: WMEs indexed by predicate shape

use crate::wme::{Fact, Wme};
use mimizuku_core::{Concept, NodeId, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Variable or constant argument in a rule-body pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternArg {
    Variable(String),
    Node(NodeId),
}

/// One atom of a rule body (or head), with named variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    /// `?x : concept`
    Type { arg: PatternArg, concept: Concept },

    /// `?x role ?y`
    Edge {
        subject: PatternArg,
        role: Role,
        object: PatternArg,
    },
}

impl Pattern {
    pub fn var(name: impl Into<String>) -> PatternArg {
        PatternArg::Variable(name.into())
    }

    pub fn args(&self) -> Vec<&PatternArg> {
        match self {
            Pattern::Type { arg, .. } => vec![arg],
            Pattern::Edge {
                subject, object, ..
            } => vec![subject, object],
        }
    }
}

/// Predicate shape an alpha memory filters on: one shape per distinct
/// concept (for type facts) or role (for edge facts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphaShape {
    Type { concept: Concept },
    Edge { role: Role },
}

impl AlphaShape {
    pub fn of_pattern(pattern: &Pattern) -> Self {
        match pattern {
            Pattern::Type { concept, .. } => AlphaShape::Type {
                concept: concept.clone(),
            },
            Pattern::Edge { role, .. } => AlphaShape::Edge { role: role.clone() },
        }
    }

    pub fn matches(&self, fact: &Fact) -> bool {
        match (self, fact) {
            (AlphaShape::Type { concept }, Fact::Type { concept: c, .. }) => concept == c,
            (AlphaShape::Edge { role }, Fact::Edge { role: r, .. }) => role == r,
            _ => false,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            AlphaShape::Type { .. } => 1,
            AlphaShape::Edge { .. } => 2,
        }
    }
}

/// An alpha memory: all WMEs matching one shape, in insertion order,
/// with a per-argument node index so joins can probe by bound node.
#[derive(Debug, Clone)]
pub struct AlphaNode {
    shape: AlphaShape,
    wmes: Vec<Wme>,
    indexes: Vec<HashMap<NodeId, Vec<usize>>>,
}

impl AlphaNode {
    pub fn new(shape: AlphaShape) -> Self {
        let indexes = (0..shape.arity()).map(|_| HashMap::new()).collect();
        Self {
            shape,
            wmes: Vec::new(),
            indexes,
        }
    }

    pub fn shape(&self) -> &AlphaShape {
        &self.shape
    }

    pub fn insert(&mut self, wme: Wme) {
        debug_assert!(self.shape.matches(&wme.fact));
        let slot = self.wmes.len();
        for (arg, index) in self.indexes.iter_mut().enumerate() {
            if let Some(node) = wme.fact.arg(arg) {
                index.entry(node).or_default().push(slot);
            }
        }
        self.wmes.push(wme);
    }

    /// Every WME in this memory, in insertion order.
    pub fn matches(&self) -> &[Wme] {
        &self.wmes
    }

    /// WMEs whose argument `arg` is bound to `node`, in insertion order.
    pub fn matches_for(&self, arg: usize, node: NodeId) -> Vec<Wme> {
        self.indexes
            .get(arg)
            .and_then(|index| index.get(&node))
            .map(|slots| slots.iter().map(|&s| self.wmes[s].clone()).collect())
            .unwrap_or_default()
    }

    /// Remove every WME depending on `branch` or later, or naming a
    /// graph node at or past `node_limit`, rebuilding the argument
    /// indexes.
    pub fn restore(&mut self, branch: u32, node_limit: u32) {
        if !self.wmes.iter().any(|w| w.retracted(branch, node_limit)) {
            return;
        }
        let kept: Vec<Wme> = self
            .wmes
            .drain(..)
            .filter(|w| !w.retracted(branch, node_limit))
            .collect();
        for index in &mut self.indexes {
            index.clear();
        }
        for wme in kept {
            self.insert(wme);
        }
    }

    pub fn clear(&mut self) {
        self.wmes.clear();
        for index in &mut self.indexes {
            index.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.wmes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wmes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimizuku_core::{DependencySet, Iri};

    fn edge(from: u32, to: u32, branch: u32) -> Wme {
        Wme::new(
            Fact::Edge {
                from: NodeId(from),
                role: Role::Object(Iri::new("r")),
                to: NodeId(to),
            },
            DependencySet::from_branch(branch),
        )
    }

    #[test]
    fn test_shape_filtering() {
        let shape = AlphaShape::Edge {
            role: Role::Object(Iri::new("r")),
        };
        assert!(shape.matches(&edge(0, 1, 1).fact));
        assert!(!shape.matches(&Fact::Type {
            node: NodeId(0),
            concept: Concept::named("A"),
        }));
    }

    #[test]
    fn test_argument_index() {
        let mut alpha = AlphaNode::new(AlphaShape::Edge {
            role: Role::Object(Iri::new("r")),
        });
        alpha.insert(edge(0, 1, 1));
        alpha.insert(edge(0, 2, 1));
        alpha.insert(edge(3, 1, 1));

        let from_zero = alpha.matches_for(0, NodeId(0));
        assert_eq!(from_zero.len(), 2);

        let to_one = alpha.matches_for(1, NodeId(1));
        assert_eq!(to_one.len(), 2);

        assert!(alpha.matches_for(0, NodeId(9)).is_empty());
    }

    #[test]
    fn test_restore_removes_dependent_wmes() {
        let mut alpha = AlphaNode::new(AlphaShape::Edge {
            role: Role::Object(Iri::new("r")),
        });
        alpha.insert(edge(0, 1, 1));
        alpha.insert(edge(0, 2, 3));
        alpha.restore(2, u32::MAX);

        assert_eq!(alpha.len(), 1);
        assert!(alpha.matches_for(1, NodeId(2)).is_empty());
        assert_eq!(alpha.matches_for(1, NodeId(1)).len(), 1);
    }
}
