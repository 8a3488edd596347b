//! Beta memories: partial-binding tokens, optionally join-indexed

use crate::wme::{Token, Wme};
use mimizuku_core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Equality join between a column already bound in the token and an
/// argument of the incoming WME.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinCondition {
    /// Index of the earlier condition whose WME binds the variable
    pub token_condition: usize,
    /// Argument position within that WME
    pub token_arg: usize,
    /// Argument position of the incoming WME
    pub wme_arg: usize,
}

impl JoinCondition {
    pub fn token_node(&self, token: &Token) -> Option<NodeId> {
        token.node_at(self.token_condition, self.token_arg)
    }

    pub fn wme_node(&self, wme: &Wme) -> Option<NodeId> {
        wme.fact.arg(self.wme_arg)
    }

    pub fn holds(&self, token: &Token, wme: &Wme) -> bool {
        match (self.token_node(token), self.wme_node(wme)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Token storage for one join position.
///
/// `Unindexed` keeps a flat list and answers probes with a linear scan;
/// `JoinIndexed` keys tokens by the join variable's bound node. The
/// variant is chosen per join condition at production-compile time.
#[derive(Debug, Clone)]
pub enum BetaMemoryIndex {
    Unindexed {
        tokens: Vec<Token>,
    },
    JoinIndexed {
        condition: JoinCondition,
        index: HashMap<NodeId, Vec<Token>>,
    },
}

impl BetaMemoryIndex {
    pub fn with_join(condition: Option<JoinCondition>) -> Self {
        match condition {
            None => BetaMemoryIndex::Unindexed { tokens: Vec::new() },
            Some(condition) => BetaMemoryIndex::JoinIndexed {
                condition,
                index: HashMap::new(),
            },
        }
    }

    pub fn is_joined(&self) -> bool {
        matches!(self, BetaMemoryIndex::JoinIndexed { .. })
    }

    pub fn add(&mut self, token: Token) {
        match self {
            BetaMemoryIndex::Unindexed { tokens } => tokens.push(token),
            BetaMemoryIndex::JoinIndexed { condition, index } => {
                // A token whose join column is unbound can never match;
                // it would be a compile bug upstream.
                let Some(key) = condition.token_node(&token) else {
                    debug_assert!(false, "token misses join column");
                    return;
                };
                index.entry(key).or_default().push(token);
            }
        }
    }

    /// Candidate tokens for an incoming WME: all of them when unindexed,
    /// only those sharing the join node otherwise.
    pub fn tokens_for(&self, wme: &Wme) -> Vec<Token> {
        match self {
            BetaMemoryIndex::Unindexed { tokens } => tokens.clone(),
            BetaMemoryIndex::JoinIndexed { condition, index } => condition
                .wme_node(wme)
                .and_then(|node| index.get(&node))
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Remove every token depending on `branch` or later, or joining a
    /// WME about a graph node at or past `node_limit`.
    pub fn restore(&mut self, branch: u32, node_limit: u32) {
        match self {
            BetaMemoryIndex::Unindexed { tokens } => {
                tokens.retain(|t| !t.retracted(branch, node_limit));
            }
            BetaMemoryIndex::JoinIndexed { index, .. } => {
                index.retain(|_, tokens| {
                    tokens.retain(|t| !t.retracted(branch, node_limit));
                    !tokens.is_empty()
                });
            }
        }
    }

    pub fn clear(&mut self) {
        match self {
            BetaMemoryIndex::Unindexed { tokens } => tokens.clear(),
            BetaMemoryIndex::JoinIndexed { index, .. } => index.clear(),
        }
    }

    pub fn tokens(&self) -> Vec<&Token> {
        match self {
            BetaMemoryIndex::Unindexed { tokens } => tokens.iter().collect(),
            BetaMemoryIndex::JoinIndexed { index, .. } => {
                index.values().flat_map(|tokens| tokens.iter()).collect()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BetaMemoryIndex::Unindexed { tokens } => tokens.len(),
            BetaMemoryIndex::JoinIndexed { index, .. } => index.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
