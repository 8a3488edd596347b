//! Choice points created by nondeterministic rules

use mimizuku_core::{Concept, DependencySet, NodeId};
use std::fmt;

/// One untried alternative of a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alternative {
    /// Assert a disjunct on the branch's node
    Disjunct(Concept),

    /// Merge two role successors (max-cardinality) or the node into a
    /// named individual (nominals)
    Merge { from: NodeId, into: NodeId },
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alternative::Disjunct(c) => write!(f, "{c}"),
            Alternative::Merge { from, into } => write!(f, "{from} → {into}"),
        }
    }
}

/// A choice point on the branch stack.
///
/// Ordinals strictly increase with stack depth and equal the branch's
/// 1-based stack position; a fact's dependency set may only reference
/// ordinals at or below the depth at which the fact was derived.
#[derive(Debug, Clone)]
pub struct Branch {
    pub ordinal: u32,
    pub node: NodeId,
    pub alternatives: Vec<Alternative>,
    /// Index of the next untried alternative
    pub next_try: usize,
    /// Dependency set of the obligation that opened the branch
    pub deps: DependencySet,
    /// Union of the clash dependencies of failed alternatives, without
    /// this branch's own ordinal; folded into the clash re-raised when
    /// the branch is exhausted
    pub failure_deps: DependencySet,
    /// Trail position at creation; restoring here undoes everything
    /// asserted since
    pub trail_mark: usize,
    /// Arena size at creation; nodes at or past this index are gone
    /// after a restore, and the network drops facts naming them
    pub node_mark: u32,
}

impl Branch {
    pub fn new(
        ordinal: u32,
        node: NodeId,
        alternatives: Vec<Alternative>,
        deps: DependencySet,
        trail_mark: usize,
        node_mark: u32,
    ) -> Self {
        Self {
            ordinal,
            node,
            alternatives,
            next_try: 0,
            deps,
            failure_deps: DependencySet::independent(),
            trail_mark,
            node_mark,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.next_try >= self.alternatives.len()
    }

    /// Take the next untried alternative, advancing the cursor.
    pub fn take_next(&mut self) -> Option<Alternative> {
        let alt = self.alternatives.get(self.next_try).cloned()?;
        self.next_try += 1;
        Some(alt)
    }

    /// Dependency set for facts asserted by an alternative: the opening
    /// obligation's set extended by this branch's ordinal.
    pub fn alternative_deps(&self) -> DependencySet {
        self.deps.with_branch(self.ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternatives_are_consumed_in_order() {
        let mut branch = Branch::new(
            1,
            NodeId(0),
            vec![
                Alternative::Disjunct(Concept::named("A")),
                Alternative::Disjunct(Concept::named("B")),
            ],
            DependencySet::independent(),
            0,
            0,
        );
        assert!(!branch.exhausted());
        assert_eq!(
            branch.take_next(),
            Some(Alternative::Disjunct(Concept::named("A")))
        );
        assert_eq!(
            branch.take_next(),
            Some(Alternative::Disjunct(Concept::named("B")))
        );
        assert!(branch.exhausted());
        assert_eq!(branch.take_next(), None);
    }

    #[test]
    fn test_alternative_deps_extend_obligation_deps() {
        let branch = Branch::new(
            4,
            NodeId(0),
            vec![Alternative::Disjunct(Concept::named("A"))],
            DependencySet::from_branch(2),
            0,
            0,
        );
        let deps = branch.alternative_deps();
        assert!(deps.contains(2));
        assert!(deps.contains(4));
    }
}
