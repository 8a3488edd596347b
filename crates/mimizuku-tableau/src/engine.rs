//! The public engine facade and its configuration

use crate::blocking::{BlockingCondition, SubsetBlocking};
use crate::branch::Branch;
use crate::cache::{CacheSafety, Expressivity, NeverSafe};
use crate::facet::{IntervalOracle, ValueSpaceOracle};
use crate::graph::NodeGraph;
use crate::timing::{InterruptHandle, Timer};
use mimizuku_core::{Assertion, Clash, Concept, DependencySet, Iri, NodeId, ReasonerError};
use mimizuku_rete::{Pattern, ProductionSpec, ReteNetwork};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Order in which a node's pending disjunctive obligations are tried.
///
/// The ordering is policy, not correctness: any fixed choice keeps runs
/// deterministic, but it decides which model is found first when several
/// alternatives are consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisjunctOrder {
    /// Highest branch ordinal in the obligation's dependency set first,
    /// so the most recently constrained obligation fails fastest
    #[default]
    MostRecent,

    /// Plain insertion order
    Insertion,
}

/// Engine configuration. All oracles are injected here; there is no
/// process-wide state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub blocking: Arc<dyn BlockingCondition + Send + Sync>,
    pub cache_safety: Arc<dyn CacheSafety + Send + Sync>,
    pub value_oracle: Arc<dyn ValueSpaceOracle + Send + Sync>,
    pub disjunct_order: DisjunctOrder,
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            blocking: Arc::new(SubsetBlocking),
            cache_safety: Arc::new(NeverSafe),
            value_oracle: Arc::new(IntervalOracle),
            disjunct_order: DisjunctOrder::default(),
            timeout: None,
        }
    }
}

/// The tableau completion engine for one knowledge base.
///
/// Owns the node graph, the branch stack and the matching network
/// exclusively; independent checks on other knowledge bases belong in
/// independent engine instances.
#[derive(Debug, Clone)]
pub struct TableauEngine {
    pub(crate) config: EngineConfig,
    pub(crate) graph: NodeGraph,
    pub(crate) network: ReteNetwork,
    pub(crate) branches: Vec<Branch>,
    pub(crate) timer: Timer,
    pub(crate) expressivity: Expressivity,
    pub(crate) last_clash: Option<Clash>,
    pub(crate) verdict: Option<bool>,
    pub(crate) started: bool,
    pub(crate) sat_cache: HashMap<Concept, bool>,
    /// (ordinal, node, alternative index) per committed alternative
    pub(crate) trace: Vec<(u32, NodeId, usize)>,
}

impl Default for TableauEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TableauEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut timer = Timer::new();
        timer.set_timeout(config.timeout);
        Self {
            config,
            graph: NodeGraph::new(),
            network: ReteNetwork::new(),
            branches: Vec::new(),
            timer,
            expressivity: Expressivity::default(),
            last_clash: None,
            verdict: None,
            started: false,
            sat_cache: HashMap::new(),
            trace: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a compiled implication rule. Productions must be in
    /// place before the first assertions arrive, so no fact misses the
    /// network.
    pub fn add_production(&mut self, mut spec: ProductionSpec) -> Result<(), ReasonerError> {
        if self.started || !self.graph.is_empty() {
            return Err(ReasonerError::InvalidInput(
                "productions must be registered before assertions are loaded".to_string(),
            ));
        }
        for pattern in spec.body.iter_mut().chain(spec.head.iter_mut()) {
            if let Pattern::Type { concept, .. } = pattern {
                Self::validate_concept(concept)?;
                let normalized = concept.nnf();
                self.expressivity.merge(Expressivity::of_concept(&normalized));
                *concept = normalized;
            }
        }
        self.network
            .add_production(spec)
            .map_err(|e| ReasonerError::InvalidInput(e.to_string()))
    }

    /// Seed the node graph and the network. Input is validated as a
    /// whole before any mutation; invalid input leaves the engine
    /// untouched.
    pub fn load_assertions(&mut self, assertions: &[Assertion]) -> Result<(), ReasonerError> {
        if self.started {
            return Err(ReasonerError::InvalidInput(
                "assertions cannot be loaded after the first dispatch".to_string(),
            ));
        }
        for assertion in assertions {
            Self::validate_assertion(assertion)?;
        }

        for assertion in assertions {
            match self.seed_assertion(assertion) {
                Ok(()) => {}
                Err(crate::completion::Halt::Clash(clash)) => {
                    // contradictory already at assertion time: the
                    // knowledge base is unconditionally inconsistent
                    debug!(%clash, "clash while loading assertions");
                    self.last_clash = Some(clash);
                    self.verdict = Some(false);
                    return Ok(());
                }
                Err(crate::completion::Halt::Fatal(e)) => return Err(e),
            }
        }
        Ok(())
    }

    fn seed_assertion(&mut self, assertion: &Assertion) -> Result<(), crate::completion::Halt> {
        use crate::completion::Halt;
        match assertion {
            Assertion::Instance {
                individual,
                concept,
            } => {
                let normalized = concept.nnf();
                self.expressivity.merge(Expressivity::of_concept(&normalized));
                let node = self.graph.ensure_named(individual);
                self.graph
                    .add_type(node, &normalized, DependencySet::independent())
                    .map_err(Halt::Clash)?;
            }
            Assertion::Related {
                subject,
                role,
                object,
            } => {
                let from = self.graph.ensure_named(subject);
                let to = self.graph.ensure_named(object);
                self.graph
                    .add_edge(from, role.clone(), to, DependencySet::independent());
            }
            Assertion::ValueRelated {
                subject,
                role,
                value,
            } => {
                self.expressivity.merge(Expressivity {
                    datatypes: true,
                    ..Default::default()
                });
                let from = self.graph.ensure_named(subject);
                let to = self.graph.ensure_literal(value);
                self.graph
                    .add_edge(from, role.clone(), to, DependencySet::independent());
            }
            Assertion::SameAs { first, second } => {
                let a = self.graph.ensure_named(first);
                let b = self.graph.ensure_named(second);
                self.graph
                    .merge(b, a, DependencySet::independent())
                    .map_err(Halt::Clash)?;
            }
            Assertion::DifferentFrom { first, second } => {
                let a = self.graph.ensure_named(first);
                let b = self.graph.ensure_named(second);
                self.graph
                    .add_distinct(a, b, DependencySet::independent())
                    .map_err(Halt::Clash)?;
            }
        }
        self.flush_events()
    }

    fn validate_assertion(assertion: &Assertion) -> Result<(), ReasonerError> {
        match assertion {
            Assertion::Instance { concept, .. } => Self::validate_concept(concept),
            Assertion::Related { role, .. } => {
                if role.is_data() {
                    return Err(ReasonerError::InvalidInput(format!(
                        "data role {role} cannot relate two individuals"
                    )));
                }
                Ok(())
            }
            Assertion::ValueRelated { role, .. } => {
                if !role.is_data() {
                    return Err(ReasonerError::InvalidInput(format!(
                        "object role {role} cannot relate an individual to a literal"
                    )));
                }
                Ok(())
            }
            Assertion::SameAs { .. } | Assertion::DifferentFrom { .. } => Ok(()),
        }
    }

    pub(crate) fn validate_concept(concept: &Concept) -> Result<(), ReasonerError> {
        match concept {
            Concept::Thing | Concept::Nothing | Concept::Named(_) | Concept::OneOf(_) => Ok(()),
            Concept::ValueSpace(range) => range.validate(),
            Concept::Not(inner) => Self::validate_concept(inner),
            Concept::And(cs) | Concept::Or(cs) => cs.iter().try_for_each(Self::validate_concept),
            Concept::Some { filler, .. } | Concept::All { filler, .. } => {
                Self::validate_concept(filler)
            }
            Concept::AtLeast { filler, .. } => match filler {
                Some(filler) => Self::validate_concept(filler),
                None => Ok(()),
            },
            Concept::AtMost { filler, .. } => match filler {
                Some(filler) if **filler != Concept::Thing => {
                    Err(ReasonerError::InvalidInput(format!(
                        "qualified at-most restriction {concept} is not supported"
                    )))
                }
                _ => Ok(()),
            },
        }
    }

    /// Run the dispatcher to fixpoint or clash. A `true` verdict leaves
    /// the graph as a completed model usable by classification and
    /// realization collaborators.
    pub fn is_consistent(&mut self) -> Result<bool, ReasonerError> {
        self.run()
    }

    /// Can `individual` consistently be an instance of `concept`?
    ///
    /// Runs on a scratch copy of the engine, so the primary model is
    /// untouched. Results for fresh (previously unconstrained)
    /// individuals are node-independent and memoized; the cache-safety
    /// oracle decides whether a memoized result may be reused.
    pub fn check(&mut self, individual: &Iri, concept: &Concept) -> Result<bool, ReasonerError> {
        Self::validate_concept(concept)?;
        let normalized = concept.nnf();

        // a named individual already in the graph carries constraints
        // of its own, so only fresh nodes may share memoized results
        let fresh = self.graph.named_node(individual).is_none();
        if fresh {
            let hypothetical = NodeId(self.graph.len() as u32);
            if let Some(&cached) = self.sat_cache.get(&normalized) {
                if self
                    .effective_cache_safety()
                    .is_safe(&normalized, hypothetical)
                {
                    debug!(%normalized, cached, "reusing memoized satisfiability result");
                    return Ok(cached);
                }
            }
        }

        let mut scratch = self.clone();
        scratch.verdict = None;
        scratch.last_clash = None;
        let node = scratch.graph.ensure_named(individual);
        let result = match scratch.graph.add_type(node, &normalized, DependencySet::independent())
        {
            Err(_) => false,
            Ok(_) => match scratch.flush_events() {
                Err(crate::completion::Halt::Clash(_)) => false,
                Err(crate::completion::Halt::Fatal(e)) => return Err(e),
                Ok(()) => scratch.run()?,
            },
        };
        if fresh {
            self.sat_cache.insert(normalized, result);
        }
        Ok(result)
    }

    /// Justification of the most recent clash: the branch choices that
    /// jointly caused it.
    pub fn explain(&self) -> Option<&DependencySet> {
        self.last_clash.as_ref().map(|clash| &clash.deps)
    }

    pub fn last_clash(&self) -> Option<&Clash> {
        self.last_clash.as_ref()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timer.set_timeout(Some(timeout));
    }

    pub fn clear_timeout(&mut self) {
        self.timer.set_timeout(None);
    }

    /// Cooperative cancellation handle, usable from another thread.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.timer.interrupt_handle()
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    /// Read access to the matching network, for diagnostics.
    pub fn network(&self) -> &ReteNetwork {
        &self.network
    }

    pub fn expressivity(&self) -> &Expressivity {
        &self.expressivity
    }

    /// Asserted and derived types of a named individual in the current
    /// (possibly completed) model.
    pub fn types_of(&self, individual: &Iri) -> Option<Vec<&Concept>> {
        let id = self.graph.named_node(individual)?;
        Some(self.graph.node(self.graph.deref(id)).type_set().collect())
    }

    /// The committed branch alternatives, in order: (ordinal, node,
    /// alternative index). Two runs with identical configuration yield
    /// identical traces.
    pub fn branch_trace(&self) -> &[(u32, NodeId, usize)] {
        &self.trace
    }

    /// The cache-safety oracle to consult, falling back to the
    /// conservative one when the configured oracle cannot support the
    /// loaded expressivity.
    pub(crate) fn effective_cache_safety(&self) -> Arc<dyn CacheSafety + Send + Sync> {
        if self.config.cache_safety.can_support(&self.expressivity) {
            Arc::clone(&self.config.cache_safety)
        } else {
            warn!(
                expressivity = ?self.expressivity,
                "configured cache-safety oracle cannot support this knowledge base; falling back to never-safe"
            );
            Arc::new(NeverSafe)
        }
    }
}
