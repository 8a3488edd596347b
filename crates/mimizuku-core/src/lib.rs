//! # Mimizuku Core
//!
//! Shared data model for the Mimizuku consistency engine:
//! - Concept and role terms with NNF negation
//! - Dependency sets linking derived facts to branch choices
//! - Clash values (detected contradictions)
//! - ABox assertions accepted by the engine
//! - Restricted value spaces (datatype facets)

pub mod assertion;
pub mod clash;
pub mod datarange;
pub mod deps;
pub mod term;

pub use assertion::Assertion;
pub use clash::{Clash, ClashKind};
pub use datarange::{DataRange, Facet, FacetRestriction};
pub use deps::DependencySet;
pub use term::{Concept, Iri, Literal, Role};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fatal reasoner errors.
///
/// A [`Clash`] is not an error: clashes are ordinary outcomes consumed by
/// backtracking. Errors in this enum abort the current check.
#[derive(Error, Debug)]
pub enum ReasonerError {
    #[error("Satisfiability check timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Satisfiability check interrupted")]
    Interrupted,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal reasoner error: {0}")]
    Internal(String),
}

/// Stable arena index of a node in the completion graph.
///
/// The rule-matching network refers to graph nodes exclusively through
/// these ids; it never owns node data.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(7).to_string(), "n7");
    }

    #[test]
    fn test_error_messages() {
        let err = ReasonerError::InvalidInput("bad facet".to_string());
        assert!(err.to_string().contains("bad facet"));

        let err = ReasonerError::Interrupted;
        assert!(err.to_string().contains("interrupted"));
    }
}
