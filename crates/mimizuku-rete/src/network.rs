//! The network: productions, delta propagation and the derived-fact agenda

use crate::alpha::{AlphaNode, AlphaShape, Pattern, PatternArg};
use crate::beta::{BetaMemoryIndex, JoinCondition};
use crate::wme::{Fact, Token, Wme};
use crate::NetworkError;
use mimizuku_core::{Concept, NodeId, Role};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Declarative input for one production, as produced by an external
/// rule-body compiler: body patterns joined on shared variables, head
/// patterns instantiated from the final binding.
#[derive(Debug, Clone)]
pub struct ProductionSpec {
    pub name: String,
    pub body: Vec<Pattern>,
    pub head: Vec<Pattern>,
}

impl ProductionSpec {
    pub fn new(name: impl Into<String>, body: Vec<Pattern>, head: Vec<Pattern>) -> Self {
        Self {
            name: name.into(),
            body,
            head,
        }
    }
}

/// One compiled body condition.
#[derive(Debug, Clone)]
struct Condition {
    alpha: usize,
    /// Constant arguments: (wme arg, required node)
    consts: Vec<(usize, NodeId)>,
    /// Repeated variables within this pattern: pairs of wme args that
    /// must bind the same node
    self_eq: Vec<(usize, usize)>,
    /// Primary equality join (used for beta-memory indexing)
    join: Option<JoinCondition>,
    /// Further shared-variable joins, verified pairwise
    extra_joins: Vec<JoinCondition>,
}

impl Condition {
    fn accepts(&self, wme: &Wme) -> bool {
        self.consts
            .iter()
            .all(|(arg, node)| wme.fact.arg(*arg) == Some(*node))
            && self
                .self_eq
                .iter()
                .all(|(a, b)| wme.fact.arg(*a) == wme.fact.arg(*b))
    }

    fn joins_ok(&self, token: &Token, wme: &Wme) -> bool {
        self.join
            .iter()
            .chain(self.extra_joins.iter())
            .all(|join| join.holds(token, wme))
    }

    /// Candidate WMEs from this condition's alpha memory for a token
    /// arriving from the left: probe the join index when there is one,
    /// scan otherwise.
    fn alpha_matches(&self, token: &Token, alpha: &AlphaNode) -> Vec<Wme> {
        match &self.join {
            Some(join) => match join.token_node(token) {
                Some(node) => alpha.matches_for(join.wme_arg, node),
                None => Vec::new(),
            },
            None => alpha.matches().to_vec(),
        }
    }
}

/// Head argument resolved at compile time.
#[derive(Debug, Clone)]
enum HeadArg {
    Bound { condition: usize, arg: usize },
    Node(NodeId),
}

#[derive(Debug, Clone)]
enum HeadAtom {
    Type { node: HeadArg, concept: Concept },
    Edge { from: HeadArg, role: Role, to: HeadArg },
}

/// A compiled production: ordered conditions, one beta memory per
/// condition, and the conclusion templates fired by complete tokens.
#[derive(Debug, Clone)]
pub struct Production {
    name: String,
    conditions: Vec<Condition>,
    memories: Vec<BetaMemoryIndex>,
    head: Vec<HeadAtom>,
}

impl Production {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn uses_alpha(&self, alpha: usize) -> Vec<usize> {
        self.conditions
            .iter()
            .enumerate()
            .filter(|(_, c)| c.alpha == alpha)
            .map(|(i, _)| i)
            .collect()
    }

    /// A new WME arrived at condition `ci`'s alpha memory.
    fn right_activate(&mut self, alphas: &[AlphaNode], ci: usize, wme: &Wme, fired: &mut Vec<Wme>) {
        if !self.conditions[ci].accepts(wme) {
            return;
        }
        if ci == 0 {
            let token = Token::unit(wme.clone());
            self.memories[0].add(token.clone());
            self.advance(alphas, token, 1, fired);
        } else {
            let candidates = self.memories[ci - 1].tokens_for(wme);
            for token in candidates {
                if self.conditions[ci].joins_ok(&token, wme) {
                    let extended = token.extended(wme.clone());
                    self.memories[ci].add(extended.clone());
                    self.advance(alphas, extended, ci + 1, fired);
                }
            }
        }
    }

    /// `token` covers conditions `0..ci`; join it across the remaining
    /// conditions against the existing alpha memories.
    fn advance(&mut self, alphas: &[AlphaNode], token: Token, ci: usize, fired: &mut Vec<Wme>) {
        if ci == self.conditions.len() {
            self.fire(&token, fired);
            return;
        }
        let candidates = {
            let condition = &self.conditions[ci];
            condition.alpha_matches(&token, &alphas[condition.alpha])
        };
        for wme in candidates {
            let condition = &self.conditions[ci];
            if condition.accepts(&wme) && condition.joins_ok(&token, &wme) {
                let extended = token.extended(wme);
                self.memories[ci].add(extended.clone());
                self.advance(alphas, extended, ci + 1, fired);
            }
        }
    }

    fn fire(&self, token: &Token, fired: &mut Vec<Wme>) {
        debug!(production = %self.name, token = %token, "production fired");
        for atom in &self.head {
            let fact = match atom {
                HeadAtom::Type { node, concept } => Fact::Type {
                    node: Self::resolve(node, token),
                    concept: concept.clone(),
                },
                HeadAtom::Edge { from, role, to } => Fact::Edge {
                    from: Self::resolve(from, token),
                    role: role.clone(),
                    to: Self::resolve(to, token),
                },
            };
            fired.push(Wme::new(fact, token.deps().clone()));
        }
    }

    fn resolve(arg: &HeadArg, token: &Token) -> NodeId {
        match arg {
            // compile guarantees the binding exists
            HeadArg::Bound { condition, arg } => token
                .node_at(*condition, *arg)
                .unwrap_or_default(),
            HeadArg::Node(node) => *node,
        }
    }

    fn restore(&mut self, branch: u32, node_limit: u32) {
        for memory in &mut self.memories {
            memory.restore(branch, node_limit);
        }
    }

    fn tokens(&self) -> Vec<&Token> {
        self.memories.iter().flat_map(|m| m.tokens()).collect()
    }
}

/// The whole matching network for one engine instance.
#[derive(Debug, Clone, Default)]
pub struct ReteNetwork {
    alphas: Vec<AlphaNode>,
    productions: Vec<Production>,
    agenda: VecDeque<Wme>,
}

impl ReteNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a production into alpha/beta topology. The declarative
    /// rule language itself is a collaborator concern; this is the
    /// surface its compiler targets.
    pub fn add_production(&mut self, spec: ProductionSpec) -> Result<(), NetworkError> {
        if spec.body.is_empty() {
            return Err(NetworkError::EmptyBody(spec.name));
        }

        // first occurrence of each variable: (condition, arg)
        let mut bindings: HashMap<String, (usize, usize)> = HashMap::new();
        let mut conditions = Vec::with_capacity(spec.body.len());

        for (ci, pattern) in spec.body.iter().enumerate() {
            let alpha = self.alpha_for(&AlphaShape::of_pattern(pattern));
            let mut consts = Vec::new();
            let mut self_eq = Vec::new();
            let mut joins = Vec::new();

            for (arg, value) in pattern.args().into_iter().enumerate() {
                match value {
                    PatternArg::Node(node) => consts.push((arg, *node)),
                    PatternArg::Variable(name) => match bindings.get(name) {
                        Some(&(bound_ci, bound_arg)) if bound_ci == ci => {
                            self_eq.push((bound_arg, arg));
                        }
                        Some(&(bound_ci, bound_arg)) => {
                            joins.push(JoinCondition {
                                token_condition: bound_ci,
                                token_arg: bound_arg,
                                wme_arg: arg,
                            });
                        }
                        None => {
                            bindings.insert(name.clone(), (ci, arg));
                        }
                    },
                }
            }

            let mut joins = joins.into_iter();
            conditions.push(Condition {
                alpha,
                consts,
                self_eq,
                join: joins.next(),
                extra_joins: joins.collect(),
            });
        }

        let head = spec
            .head
            .iter()
            .map(|pattern| Self::compile_head(&spec.name, pattern, &bindings))
            .collect::<Result<Vec<_>, _>>()?;

        // memories[i] holds tokens covering conditions 0..=i and is
        // indexed for the join of condition i+1
        let memories = (0..conditions.len())
            .map(|i| BetaMemoryIndex::with_join(conditions.get(i + 1).and_then(|c| c.join.clone())))
            .collect();

        self.productions.push(Production {
            name: spec.name,
            conditions,
            memories,
            head,
        });
        Ok(())
    }

    fn compile_head(
        production: &str,
        pattern: &Pattern,
        bindings: &HashMap<String, (usize, usize)>,
    ) -> Result<HeadAtom, NetworkError> {
        let resolve = |value: &PatternArg| -> Result<HeadArg, NetworkError> {
            match value {
                PatternArg::Node(node) => Ok(HeadArg::Node(*node)),
                PatternArg::Variable(name) => {
                    bindings
                        .get(name)
                        .map(|&(condition, arg)| HeadArg::Bound { condition, arg })
                        .ok_or_else(|| NetworkError::UnboundVariable {
                            production: production.to_string(),
                            variable: name.clone(),
                        })
                }
            }
        };
        match pattern {
            Pattern::Type { arg, concept } => Ok(HeadAtom::Type {
                node: resolve(arg)?,
                concept: concept.clone(),
            }),
            Pattern::Edge {
                subject,
                role,
                object,
            } => Ok(HeadAtom::Edge {
                from: resolve(subject)?,
                role: role.clone(),
                to: resolve(object)?,
            }),
        }
    }

    fn alpha_for(&mut self, shape: &AlphaShape) -> usize {
        if let Some(pos) = self.alphas.iter().position(|a| a.shape() == shape) {
            return pos;
        }
        self.alphas.push(AlphaNode::new(shape.clone()));
        self.alphas.len() - 1
    }

    /// Feed one new fact through the network. Matched conclusions land
    /// on the agenda as derived facts whose dependency set is the union
    /// of the contributing WMEs' sets.
    pub fn insert(&mut self, wme: Wme) {
        let matching: Vec<usize> = self
            .alphas
            .iter()
            .enumerate()
            .filter(|(_, a)| a.shape().matches(&wme.fact))
            .map(|(i, _)| i)
            .collect();
        if matching.is_empty() {
            return;
        }
        for &alpha in &matching {
            self.alphas[alpha].insert(wme.clone());
        }

        let mut fired = Vec::new();
        for production in &mut self.productions {
            for &alpha in &matching {
                for ci in production.uses_alpha(alpha) {
                    production.right_activate(&self.alphas, ci, &wme, &mut fired);
                }
            }
        }
        self.agenda.extend(fired);
    }

    /// Derived facts waiting to be asserted into the node graph.
    pub fn drain(&mut self) -> Vec<Wme> {
        self.agenda.drain(..).collect()
    }

    /// Next derived fact, oldest first. Consumers take facts one at a
    /// time so a clash leaves the rest of the agenda intact.
    pub fn pop_pending(&mut self) -> Option<Wme> {
        self.agenda.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.agenda.is_empty()
    }

    /// Roll the network back past `branch`: every WME, token and queued
    /// derived fact depending on it (or any later branch), or naming a
    /// graph node the rollback discarded (`node_limit` and beyond),
    /// disappears from every memory it occupies.
    pub fn restore(&mut self, branch: u32, node_limit: u32) {
        for alpha in &mut self.alphas {
            alpha.restore(branch, node_limit);
        }
        for production in &mut self.productions {
            production.restore(branch, node_limit);
        }
        self.agenda.retain(|wme| !wme.retracted(branch, node_limit));
    }

    pub fn clear(&mut self) {
        for alpha in &mut self.alphas {
            alpha.clear();
        }
        for production in &mut self.productions {
            for memory in &mut production.memories {
                memory.clear();
            }
        }
        self.agenda.clear();
    }

    /// All live tokens across all productions (test/diagnostic surface).
    pub fn tokens(&self) -> Vec<&Token> {
        self.productions.iter().flat_map(|p| p.tokens()).collect()
    }

    pub fn production_count(&self) -> usize {
        self.productions.len()
    }
}
