//! Dependency sets: which branch choices justify a derived fact

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// An immutable, mergeable set of branch ordinals.
///
/// Every asserted fact carries one. The empty set means the fact holds
/// unconditionally: it can never be removed by backtracking, and a clash
/// carrying the empty set makes the whole knowledge base inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DependencySet {
    // sorted ascending, no duplicates
    branches: SmallVec<[u32; 8]>,
}

impl DependencySet {
    /// The unconditional dependency set (depends on no branch).
    pub fn independent() -> Self {
        Self::default()
    }

    pub fn from_branch(branch: u32) -> Self {
        let mut branches = SmallVec::new();
        branches.push(branch);
        Self { branches }
    }

    pub fn is_independent(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn contains(&self, branch: u32) -> bool {
        self.branches.binary_search(&branch).is_ok()
    }

    /// Highest branch ordinal in the set, if any.
    pub fn max_branch(&self) -> Option<u32> {
        self.branches.last().copied()
    }

    /// True if the set references `branch` or any later branch.
    ///
    /// This is the retraction predicate: restoring to `branch` removes
    /// every fact and token for which this returns true.
    pub fn depends_beyond(&self, branch: u32) -> bool {
        self.max_branch().is_some_and(|max| max >= branch)
    }

    /// A copy of this set extended with `branch`.
    pub fn with_branch(&self, branch: u32) -> Self {
        let mut out = self.clone();
        if let Err(pos) = out.branches.binary_search(&branch) {
            out.branches.insert(pos, branch);
        }
        out
    }

    /// A copy of this set without `branch`.
    pub fn without_branch(&self, branch: u32) -> Self {
        let mut out = self.clone();
        if let Ok(pos) = out.branches.binary_search(&branch) {
            out.branches.remove(pos);
        }
        out
    }

    /// Set union. A fact derivable via either of two justifications
    /// depends on the union of both.
    pub fn union(&self, other: &Self) -> Self {
        let mut out = SmallVec::with_capacity(self.branches.len() + other.branches.len());
        let (mut i, mut j) = (0, 0);
        while i < self.branches.len() && j < other.branches.len() {
            match self.branches[i].cmp(&other.branches[j]) {
                std::cmp::Ordering::Less => {
                    out.push(self.branches[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push(other.branches[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    out.push(self.branches[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&self.branches[i..]);
        out.extend_from_slice(&other.branches[j..]);
        Self { branches: out }
    }

    pub fn branches(&self) -> impl Iterator<Item = u32> + '_ {
        self.branches.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

impl fmt::Display for DependencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.branches.is_empty() {
            return write!(f, "∅");
        }
        write!(f, "{{")?;
        for (i, b) in self.branches.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{b}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ds(branches: &[u32]) -> DependencySet {
        branches
            .iter()
            .fold(DependencySet::independent(), |acc, b| acc.with_branch(*b))
    }

    #[test]
    fn test_independent_set() {
        let empty = DependencySet::independent();
        assert!(empty.is_independent());
        assert_eq!(empty.max_branch(), None);
        assert!(!empty.depends_beyond(0));
    }

    #[test]
    fn test_union_keeps_order_and_dedupes() {
        let a = ds(&[3, 1]);
        let b = ds(&[2, 3, 5]);
        let u = a.union(&b);
        assert_eq!(u.branches().collect::<Vec<_>>(), vec![1, 2, 3, 5]);
        assert_eq!(u.max_branch(), Some(5));
    }

    #[test]
    fn test_depends_beyond() {
        let d = ds(&[2, 4]);
        assert!(d.depends_beyond(4));
        assert!(d.depends_beyond(3));
        assert!(!d.depends_beyond(5));
    }

    #[test]
    fn test_without_branch() {
        let d = ds(&[1, 2, 3]);
        let trimmed = d.without_branch(2);
        assert_eq!(trimmed.branches().collect::<Vec<_>>(), vec![1, 3]);
        // removing an absent branch is a no-op
        assert_eq!(trimmed.without_branch(9), trimmed);
    }

    fn arb_ds() -> impl Strategy<Value = DependencySet> {
        prop::collection::vec(0u32..64, 0..12).prop_map(|v| ds(&v))
    }

    proptest! {
        #[test]
        fn prop_union_is_commutative(a in arb_ds(), b in arb_ds()) {
            prop_assert_eq!(a.union(&b), b.union(&a));
        }

        #[test]
        fn prop_union_is_idempotent(a in arb_ds()) {
            prop_assert_eq!(a.union(&a), a.clone());
        }

        #[test]
        fn prop_union_contains_both_sides(a in arb_ds(), b in arb_ds()) {
            let u = a.union(&b);
            for branch in a.branches().chain(b.branches()) {
                prop_assert!(u.contains(branch));
            }
        }

        #[test]
        fn prop_max_is_monotone_under_union(a in arb_ds(), b in arb_ds()) {
            let u = a.union(&b);
            prop_assert_eq!(u.max_branch(), a.max_branch().max(b.max_branch()));
        }
    }
}
