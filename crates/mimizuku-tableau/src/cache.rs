//! Cache safety: when may a memoized satisfiability result be reused?

use mimizuku_core::{Concept, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Constructor flags of the loaded knowledge base, as far as cache
/// reuse is concerned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expressivity {
    /// `OneOf` enumerations present (satisfiability becomes
    /// context-dependent)
    pub nominals: bool,

    /// Cardinality restrictions present
    pub cardinality: bool,

    /// Restricted value spaces present
    pub datatypes: bool,
}

impl Expressivity {
    pub fn of_concept(concept: &Concept) -> Self {
        let mut e = Self::default();
        e.scan(concept);
        e
    }

    pub fn merge(&mut self, other: Self) {
        self.nominals |= other.nominals;
        self.cardinality |= other.cardinality;
        self.datatypes |= other.datatypes;
    }

    fn scan(&mut self, concept: &Concept) {
        match concept {
            Concept::Thing | Concept::Nothing | Concept::Named(_) => {}
            Concept::OneOf(_) => self.nominals = true,
            Concept::ValueSpace(_) => self.datatypes = true,
            Concept::Not(inner) => self.scan(inner),
            Concept::And(cs) | Concept::Or(cs) => cs.iter().for_each(|c| self.scan(c)),
            Concept::Some { filler, .. } | Concept::All { filler, .. } => self.scan(filler),
            Concept::AtLeast { filler, .. } | Concept::AtMost { filler, .. } => {
                self.cardinality = true;
                if let Some(filler) = filler {
                    self.scan(filler);
                }
            }
        }
    }
}

/// Decides whether a previously memoized satisfiability result for a
/// concept may be reused for a node without re-derivation.
pub trait CacheSafety: fmt::Debug {
    fn is_safe(&self, concept: &Concept, node: NodeId) -> bool;

    /// Whether this oracle is sound for a knowledge base of the given
    /// expressivity.
    fn can_support(&self, expressivity: &Expressivity) -> bool;
}

/// The conservative oracle: reuse is never safe, any expressivity is
/// supported.
#[derive(Debug, Default)]
pub struct NeverSafe;

impl CacheSafety for NeverSafe {
    fn is_safe(&self, _concept: &Concept, _node: NodeId) -> bool {
        false
    }

    fn can_support(&self, _expressivity: &Expressivity) -> bool {
        true
    }
}

/// Permissive oracle for nominal-free knowledge bases: a concept that
/// mentions no individual is satisfiable independently of the node it is
/// checked at.
#[derive(Debug, Default)]
pub struct NoNominalsSafety;

impl CacheSafety for NoNominalsSafety {
    fn is_safe(&self, concept: &Concept, _node: NodeId) -> bool {
        !Expressivity::of_concept(concept).nominals
    }

    fn can_support(&self, expressivity: &Expressivity) -> bool {
        !expressivity.nominals
    }
}
