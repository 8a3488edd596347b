//! Working-memory elements and tokens

use mimizuku_core::{Concept, DependencySet, NodeId, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An atomic fact over graph nodes, as seen by the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fact {
    /// `node : concept`
    Type { node: NodeId, concept: Concept },

    /// `from role to`
    Edge {
        from: NodeId,
        role: Role,
        to: NodeId,
    },
}

impl Fact {
    /// Node bound at argument position `index` (0 = subject, 1 = object).
    pub fn arg(&self, index: usize) -> Option<NodeId> {
        match (self, index) {
            (Fact::Type { node, .. }, 0) => Some(*node),
            (Fact::Edge { from, .. }, 0) => Some(*from),
            (Fact::Edge { to, .. }, 1) => Some(*to),
            _ => None,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Fact::Type { .. } => 1,
            Fact::Edge { .. } => 2,
        }
    }

    /// True if the fact names a node at or past `node_limit`. Used on
    /// restore to drop facts about retracted graph nodes.
    pub fn references_beyond(&self, node_limit: u32) -> bool {
        match self {
            Fact::Type { node, .. } => node.0 >= node_limit,
            Fact::Edge { from, to, .. } => from.0 >= node_limit || to.0 >= node_limit,
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::Type { node, concept } => write!(f, "{node} : {concept}"),
            Fact::Edge { from, role, to } => write!(f, "{from} {role} {to}"),
        }
    }
}

/// A working-memory element: a fact plus the branch choices justifying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wme {
    pub fact: Fact,
    pub deps: DependencySet,
}

impl Wme {
    pub fn new(fact: Fact, deps: DependencySet) -> Self {
        Self { fact, deps }
    }

    pub fn depends_beyond(&self, branch: u32) -> bool {
        self.deps.depends_beyond(branch)
    }

    /// Retraction predicate for a rollback past `branch` that also
    /// discarded every graph node at or past `node_limit`.
    pub fn retracted(&self, branch: u32, node_limit: u32) -> bool {
        self.deps.depends_beyond(branch) || self.fact.references_beyond(node_limit)
    }
}

/// A partial variable binding: the WMEs joined so far for one production,
/// with the union of their dependency sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    wmes: Vec<Wme>,
    deps: DependencySet,
}

impl Token {
    pub fn unit(wme: Wme) -> Self {
        let deps = wme.deps.clone();
        Self {
            wmes: vec![wme],
            deps,
        }
    }

    /// A new token extending this one with `wme`.
    pub fn extended(&self, wme: Wme) -> Self {
        let deps = self.deps.union(&wme.deps);
        let mut wmes = self.wmes.clone();
        wmes.push(wme);
        Self { wmes, deps }
    }

    pub fn deps(&self) -> &DependencySet {
        &self.deps
    }

    pub fn wmes(&self) -> &[Wme] {
        &self.wmes
    }

    /// Node bound by the WME of condition `condition` at position `arg`.
    pub fn node_at(&self, condition: usize, arg: usize) -> Option<NodeId> {
        self.wmes.get(condition)?.fact.arg(arg)
    }

    /// Retraction predicate; mirrors the one on facts so a rolled-back
    /// branch removes tokens and WMEs together.
    pub fn depends_beyond(&self, branch: u32) -> bool {
        self.deps.depends_beyond(branch)
    }

    /// A token is retracted as soon as any WME it joined is.
    pub fn retracted(&self, branch: u32, node_limit: u32) -> bool {
        self.deps.depends_beyond(branch)
            || self.wmes.iter().any(|w| w.fact.references_beyond(node_limit))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, wme) in self.wmes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", wme.fact)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimizuku_core::Iri;

    fn type_wme(node: u32, name: &str, branch: Option<u32>) -> Wme {
        Wme::new(
            Fact::Type {
                node: NodeId(node),
                concept: Concept::named(name),
            },
            branch.map_or_else(DependencySet::independent, DependencySet::from_branch),
        )
    }

    #[test]
    fn test_fact_args() {
        let edge = Fact::Edge {
            from: NodeId(1),
            role: Role::Object(Iri::new("r")),
            to: NodeId(2),
        };
        assert_eq!(edge.arg(0), Some(NodeId(1)));
        assert_eq!(edge.arg(1), Some(NodeId(2)));
        assert_eq!(edge.arg(2), None);
    }

    #[test]
    fn test_token_deps_union() {
        let token = Token::unit(type_wme(0, "A", Some(1))).extended(type_wme(1, "B", Some(3)));
        assert!(token.deps().contains(1));
        assert!(token.deps().contains(3));
        assert_eq!(token.deps().max_branch(), Some(3));
    }

    #[test]
    fn test_token_retraction_predicate() {
        let token = Token::unit(type_wme(0, "A", Some(2)));
        assert!(token.depends_beyond(2));
        assert!(!token.depends_beyond(3));

        let independent = Token::unit(type_wme(0, "A", None));
        assert!(!independent.depends_beyond(0));
    }
}
