//! # Mimizuku Tableau
//!
//! The completion engine deciding knowledge-base consistency:
//! - an arena node graph with union-find merges and a reversible trail
//! - a branch stack for nondeterministic rule choices
//! - a priority-ordered completion-rule dispatcher
//! - subset blocking to guarantee termination on cyclic models
//! - cache-safety and value-space oracles injected via configuration
//!
//! The engine is single-threaded and cooperative: independent checks may
//! run on separate threads as long as each owns its own [`TableauEngine`].

pub mod blocking;
pub mod branch;
pub mod cache;
pub mod completion;
pub mod engine;
pub mod facet;
pub mod graph;
pub mod node;
pub mod timing;

pub use blocking::{BlockingCondition, BlockingContext, EqualityBlocking, SubsetBlocking};
pub use branch::{Alternative, Branch};
pub use cache::{CacheSafety, Expressivity, NeverSafe, NoNominalsSafety};
pub use completion::RuleKind;
pub use engine::{DisjunctOrder, EngineConfig, TableauEngine};
pub use facet::{IntervalOracle, ValueSpaceOracle};
pub use graph::NodeGraph;
pub use node::{Edge, Node, NodeName};
pub use timing::{InterruptHandle, Timer};
