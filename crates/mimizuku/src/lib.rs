//! # 🦉 Mimizuku - Description-Logic Consistency Engine
//!
//! Mimizuku decides satisfiability of a knowledge base of concept and role
//! assertions by tableau completion: it incrementally expands a model graph
//! under a fixed set of expansion rules until a contradiction (clash) is
//! found or a stable, possibly cyclic, model remains.
//!
//! ## Features
//!
//! - **Dependency-directed backtracking**: every fact carries the branch
//!   choices that justify it, so a clash resumes exactly at the choice
//!   point it depends on
//! - **Subset blocking**: cyclic models terminate without losing soundness
//! - **Incremental rule matching**: implication rules are evaluated by an
//!   alpha/beta memory network re-checking only the deltas of each
//!   tableau mutation
//! - **Injected oracles**: cache safety and datatype facet reasoning are
//!   configuration values, not process-wide state
//!
//! ## Quick Start
//!
//! ```rust
//! use mimizuku::prelude::*;
//!
//! fn main() -> Result<(), ReasonerError> {
//!     let mut engine = TableauEngine::new();
//!
//!     engine.load_assertions(&[
//!         Assertion::instance(
//!             "http://example.org/x",
//!             Concept::Or(vec![Concept::named("A"), Concept::named("B")]),
//!         ),
//!         Assertion::instance("http://example.org/x", Concept::not(Concept::named("A"))),
//!     ])?;
//!
//!     assert!(engine.is_consistent()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Mimizuku consists of three specialized crates:
//!
//! - **`mimizuku-core`**: concept/role terms, dependency sets, clashes
//! - **`mimizuku-rete`**: the incremental rule-matching network
//! - **`mimizuku-tableau`**: the completion engine and its oracles
//!
//! ## Feature Flags
//!
//! - `full` (default): all crates included
//! - `core`: only the shared data model
//! - `rete`: the rule-matching network
//! - `tableau`: the completion engine

// Re-export all public APIs from sub-crates (feature-gated)

#[cfg(feature = "mimizuku-core")]
pub use mimizuku_core as core;

#[cfg(feature = "mimizuku-rete")]
pub use mimizuku_rete as rete;

#[cfg(feature = "mimizuku-tableau")]
pub use mimizuku_tableau as tableau;

// Convenience re-exports for common types (feature-gated)
#[cfg(feature = "mimizuku-core")]
pub use mimizuku_core::{
    Assertion, Clash, ClashKind, Concept, DependencySet, Iri, Literal, NodeId, ReasonerError, Role,
};

#[cfg(feature = "mimizuku-rete")]
pub use mimizuku_rete::{Pattern, ProductionSpec, ReteNetwork};

#[cfg(feature = "mimizuku-tableau")]
pub use mimizuku_tableau::{DisjunctOrder, EngineConfig, TableauEngine};

// Commonly used external dependencies
pub use anyhow;
pub use serde;
pub use serde_json;

/// Prelude module for convenient imports
///
/// ```rust
/// use mimizuku::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "mimizuku-core")]
    pub use mimizuku_core::{
        Assertion, Clash, Concept, DependencySet, Iri, Literal, ReasonerError, Role,
    };

    #[cfg(feature = "mimizuku-rete")]
    pub use mimizuku_rete::{Pattern, ProductionSpec};

    #[cfg(feature = "mimizuku-tableau")]
    pub use mimizuku_tableau::{EngineConfig, TableauEngine};

    // Common external types
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::Value;
}

// Version information
/// Current version of Mimizuku
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.chars().all(|c| c.is_ascii_digit() || c == '.'));
    }

    #[cfg(feature = "mimizuku-tableau")]
    #[test]
    fn test_basic_engine_creation() {
        let mut engine = TableauEngine::new();
        let verdict = engine.is_consistent().unwrap();
        // an empty knowledge base is trivially consistent
        assert!(verdict);
    }
}
