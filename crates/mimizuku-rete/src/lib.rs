//! # Mimizuku Rete
//!
//! Incremental pattern-matching network for implication-style rules.
//! Working facts (WMEs) flow through alpha memories filtered by predicate
//! shape into per-production beta memories holding partial variable
//! bindings (tokens). Matching is delta-driven: each new fact re-evaluates
//! only the joins it can extend. Every fact and token carries a dependency
//! set so backtracking can retract exactly what a closed branch produced.

pub mod alpha;
pub mod beta;
pub mod network;
pub mod wme;

pub use alpha::{AlphaNode, AlphaShape, Pattern, PatternArg};
pub use beta::{BetaMemoryIndex, JoinCondition};
pub use network::{Production, ProductionSpec, ReteNetwork};
pub use wme::{Fact, Token, Wme};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Production '{production}' uses unbound variable '{variable}' in its head")]
    UnboundVariable {
        production: String,
        variable: String,
    },

    #[error("Production '{0}' has an empty body")]
    EmptyBody(String),

    #[error("Invalid pattern in production '{production}': {message}")]
    BadPattern {
        production: String,
        message: String,
    },
}
