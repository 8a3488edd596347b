//! The completion-rule dispatcher: saturation, branching, backtracking
//!
//! Rules run in a fixed priority order, deterministic rules first, so
//! branching work is only spent once the deterministic consequences are
//! exhausted. A clash travels as a value back to the dispatch loop;
//! backtracking is an explicit walk over the branch stack, never stack
//! unwinding.

use crate::blocking;
use crate::branch::{Alternative, Branch};
use crate::engine::{DisjunctOrder, TableauEngine};
use itertools::Itertools;
use mimizuku_core::{
    Clash, ClashKind, Concept, DataRange, DependencySet, NodeId, ReasonerError, Role,
};
use mimizuku_rete::{Fact, Wme};
use std::fmt;
use tracing::{debug, info, trace};

/// Expansion-rule categories, one per obligation kind. The numeric
/// order is the dispatch priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleKind {
    /// ⊓: assert every conjunct
    Conjunction,
    /// ∀: push the filler over existing edges
    Universal,
    /// Restricted value spaces, via the facet oracle
    ValueSpace,
    /// ∃: ensure a witness successor exists
    Existential,
    /// ≥n: ensure n pairwise-distinct successors exist
    AtLeast,
    /// ⊔: branch over the disjuncts
    Disjunction,
    /// ≤n: branch over successor merges
    AtMost,
    /// {a, …}: branch over merges with the named individuals
    Nominal,
}

impl RuleKind {
    pub const COUNT: usize = 8;

    pub const PRIORITY_ORDER: [RuleKind; RuleKind::COUNT] = [
        RuleKind::Conjunction,
        RuleKind::Universal,
        RuleKind::ValueSpace,
        RuleKind::Existential,
        RuleKind::AtLeast,
        RuleKind::Disjunction,
        RuleKind::AtMost,
        RuleKind::Nominal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// The obligation category a concept belongs to, if it carries one.
    pub fn of(concept: &Concept) -> Option<RuleKind> {
        match concept {
            Concept::And(_) => Some(RuleKind::Conjunction),
            Concept::All { .. } => Some(RuleKind::Universal),
            Concept::ValueSpace(_) => Some(RuleKind::ValueSpace),
            Concept::Some { .. } => Some(RuleKind::Existential),
            Concept::AtLeast { .. } => Some(RuleKind::AtLeast),
            Concept::Or(_) => Some(RuleKind::Disjunction),
            Concept::AtMost { .. } => Some(RuleKind::AtMost),
            Concept::OneOf(_) => Some(RuleKind::Nominal),
            _ => None,
        }
    }

    /// Rules that introduce fresh successors; these consult blocking.
    pub fn is_generating(self) -> bool {
        matches!(self, RuleKind::Existential | RuleKind::AtLeast)
    }

    /// Rules that may open a branch.
    pub fn is_nondeterministic(self) -> bool {
        matches!(
            self,
            RuleKind::Disjunction | RuleKind::AtMost | RuleKind::Nominal
        )
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Conjunction => "conjunction",
            RuleKind::Universal => "universal",
            RuleKind::ValueSpace => "value-space",
            RuleKind::Existential => "existential",
            RuleKind::AtLeast => "at-least",
            RuleKind::Disjunction => "disjunction",
            RuleKind::AtMost => "at-most",
            RuleKind::Nominal => "nominal",
        };
        write!(f, "{name}")
    }
}

/// Outcome of one saturation pass.
pub(crate) enum Expansion {
    Complete,
    Clash(Clash),
}

/// Abnormal exit from a rule application: either a recoverable clash or
/// a fatal error. Clashes feed backtracking; fatal errors surface to
/// the caller untouched.
pub(crate) enum Halt {
    Clash(Clash),
    Fatal(ReasonerError),
}

impl From<Clash> for Halt {
    fn from(clash: Clash) -> Self {
        Halt::Clash(clash)
    }
}

impl From<ReasonerError> for Halt {
    fn from(err: ReasonerError) -> Self {
        Halt::Fatal(err)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RuleOutcome {
    changed: bool,
    branched: bool,
}

impl RuleOutcome {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed() -> Self {
        Self {
            changed: true,
            branched: false,
        }
    }

    fn branched() -> Self {
        Self {
            changed: true,
            branched: true,
        }
    }
}

impl TableauEngine {
    /// Run to fixpoint or final clash.
    pub(crate) fn run(&mut self) -> Result<bool, ReasonerError> {
        if let Some(verdict) = self.verdict {
            return Ok(verdict);
        }
        self.started = true;
        self.timer.start();
        info!(nodes = self.graph.len(), "starting consistency check");

        loop {
            match self.saturate()? {
                Expansion::Complete => {
                    info!(
                        elapsed = ?self.timer.elapsed(),
                        branches = self.branches.len(),
                        "model complete: consistent"
                    );
                    self.verdict = Some(true);
                    return Ok(true);
                }
                Expansion::Clash(clash) => {
                    debug!(%clash, "clash raised");
                    if self.backtrack(&clash)? {
                        continue;
                    }
                    info!(elapsed = ?self.timer.elapsed(), "no model: inconsistent");
                    self.verdict = Some(false);
                    return Ok(false);
                }
            }
        }
    }

    /// Apply rules until no rule produces new facts and the network has
    /// no pending derived facts, or a clash is raised.
    fn saturate(&mut self) -> Result<Expansion, ReasonerError> {
        loop {
            self.timer.check()?;

            // derived facts feed back into the graph first, one at a
            // time: a clash must leave the remaining agenda intact
            if let Some(wme) = self.network.pop_pending() {
                match self.assert_derived(wme) {
                    Ok(()) => continue,
                    Err(Halt::Clash(clash)) => return Ok(Expansion::Clash(clash)),
                    Err(Halt::Fatal(e)) => return Err(e),
                }
            }

            match self.apply_rules() {
                Ok(true) => continue,
                Ok(false) => {
                    if self.network.has_pending() {
                        continue;
                    }
                    return Ok(Expansion::Complete);
                }
                Err(Halt::Clash(clash)) => return Ok(Expansion::Clash(clash)),
                Err(Halt::Fatal(e)) => return Err(e),
            }
        }
    }

    /// One pass over the priority table. Returns true when any rule
    /// changed the graph, in which case dispatch restarts from the
    /// highest-priority rule.
    fn apply_rules(&mut self) -> Result<bool, Halt> {
        for kind in RuleKind::PRIORITY_ORDER {
            if self.apply_kind(kind)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn apply_kind(&mut self, kind: RuleKind) -> Result<bool, Halt> {
        let condition = self.config.blocking.clone();
        let mut changed = false;
        let total = self.graph.len() as u32;

        for raw in 0..total {
            let id = NodeId(raw);
            let (is_merged, is_literal) = {
                let node = self.graph.node(id);
                (node.is_merged(), node.is_literal())
            };
            if is_merged {
                continue;
            }
            if kind == RuleKind::ValueSpace {
                changed |= self.apply_value_space(id)?;
                continue;
            }
            if is_literal {
                continue;
            }
            if kind.is_generating() && blocking::is_blocked(&self.graph, condition.as_ref(), id) {
                trace!(node = %id, %kind, "blocked: obligation suspended");
                continue;
            }

            let (queue_len, mut pending) = {
                let node = self.graph.node(id);
                let queue = node.queue(kind);
                let start = node.apply_next[kind.index()];
                (queue.len(), queue.get(start..).unwrap_or(&[]).to_vec())
            };
            if pending.is_empty() {
                continue;
            }

            if kind == RuleKind::Disjunction
                && self.config.disjunct_order == DisjunctOrder::MostRecent
            {
                let graph = &self.graph;
                pending.sort_by(|a, b| {
                    let ka = graph.get_dependency(id, a).and_then(DependencySet::max_branch);
                    let kb = graph.get_dependency(id, b).and_then(DependencySet::max_branch);
                    kb.cmp(&ka)
                });
            }

            for concept in &pending {
                let Some(deps) = self.graph.get_dependency(id, concept).cloned() else {
                    continue;
                };
                trace!(node = %id, %kind, %concept, "applying rule");
                let outcome = self.apply_obligation(id, kind, concept, &deps)?;
                self.flush_events()?;
                changed |= outcome.changed;
                if outcome.branched || self.graph.node(id).is_merged() {
                    // the cursor is left untouched: re-entry re-scans
                    // this batch, and satisfied entries skip cheaply
                    return Ok(true);
                }
            }
            self.graph.set_cursor(id, kind.index(), queue_len);
        }
        Ok(changed)
    }

    fn apply_obligation(
        &mut self,
        node: NodeId,
        kind: RuleKind,
        concept: &Concept,
        deps: &DependencySet,
    ) -> Result<RuleOutcome, Halt> {
        match (kind, concept) {
            (RuleKind::Conjunction, Concept::And(cs)) => self.apply_conjunction(node, cs, deps),
            (RuleKind::Universal, Concept::All { role, filler }) => {
                self.apply_universal(node, role, filler, deps)
            }
            (RuleKind::Existential, Concept::Some { role, filler }) => {
                self.apply_existential(node, role, filler, deps)
            }
            (RuleKind::AtLeast, Concept::AtLeast { n, role, filler }) => {
                self.apply_at_least(node, *n, role, filler.as_deref(), deps)
            }
            (RuleKind::Disjunction, Concept::Or(disjuncts)) => {
                self.apply_disjunction(node, concept, disjuncts, deps)
            }
            (RuleKind::AtMost, Concept::AtMost { n, role, .. }) => {
                self.apply_at_most(node, *n, role, deps)
            }
            (RuleKind::Nominal, Concept::OneOf(individuals)) => {
                self.apply_nominal(node, concept, individuals, deps)
            }
            _ => Ok(RuleOutcome::unchanged()),
        }
    }

    fn apply_conjunction(
        &mut self,
        node: NodeId,
        conjuncts: &[Concept],
        deps: &DependencySet,
    ) -> Result<RuleOutcome, Halt> {
        let mut changed = false;
        for conjunct in conjuncts {
            changed |= self.graph.add_type(node, conjunct, deps.clone())?;
        }
        Ok(if changed {
            RuleOutcome::changed()
        } else {
            RuleOutcome::unchanged()
        })
    }

    fn apply_universal(
        &mut self,
        node: NodeId,
        role: &Role,
        filler: &Concept,
        deps: &DependencySet,
    ) -> Result<RuleOutcome, Halt> {
        let mut changed = false;
        for (successor, edge_deps) in self.graph.successors(node, role) {
            changed |= self
                .graph
                .add_type(successor, filler, deps.union(&edge_deps))?;
        }
        Ok(if changed {
            RuleOutcome::changed()
        } else {
            RuleOutcome::unchanged()
        })
    }

    fn apply_existential(
        &mut self,
        node: NodeId,
        role: &Role,
        filler: &Concept,
        deps: &DependencySet,
    ) -> Result<RuleOutcome, Halt> {
        let witnessed = self
            .graph
            .successors(node, role)
            .iter()
            .any(|(s, _)| self.graph.has_type(*s, filler));
        if witnessed {
            return Ok(RuleOutcome::unchanged());
        }

        let fresh = if role.is_data() {
            self.graph.create_anonymous_literal(node)
        } else {
            self.graph.create_anonymous(node)
        };
        debug!(node = %node, %role, successor = %fresh, "existential: fresh successor");
        self.graph.add_edge(node, role.clone(), fresh, deps.clone());
        self.graph.add_type(fresh, filler, deps.clone())?;
        Ok(RuleOutcome::changed())
    }

    fn apply_at_least(
        &mut self,
        node: NodeId,
        n: u32,
        role: &Role,
        filler: Option<&Concept>,
        deps: &DependencySet,
    ) -> Result<RuleOutcome, Halt> {
        if n == 0 || self.has_distinct_successors(node, role, n as usize) {
            return Ok(RuleOutcome::unchanged());
        }

        debug!(node = %node, %role, n, "at-least: creating distinct successors");
        let fresh: Vec<NodeId> = (0..n)
            .map(|_| {
                if role.is_data() {
                    self.graph.create_anonymous_literal(node)
                } else {
                    self.graph.create_anonymous(node)
                }
            })
            .collect();
        for id in &fresh {
            self.graph.add_edge(node, role.clone(), *id, deps.clone());
            if let Some(filler) = filler {
                self.graph.add_type(*id, filler, deps.clone())?;
            }
        }
        for (a, b) in fresh.iter().tuple_combinations() {
            self.graph.add_distinct(*a, *b, deps.clone())?;
        }
        Ok(RuleOutcome::changed())
    }

    /// A greedy scan for `n` mutually-distinct successors; distinctness
    /// comes mostly from at-least clusters, where greedy is exact.
    fn has_distinct_successors(&self, node: NodeId, role: &Role, n: usize) -> bool {
        let successors = self.graph.successors(node, role);
        if n <= 1 {
            return !successors.is_empty();
        }
        let mut chosen: Vec<NodeId> = Vec::new();
        for (candidate, _) in successors {
            if chosen.iter().all(|c| self.graph.are_distinct(*c, candidate)) {
                chosen.push(candidate);
                if chosen.len() >= n {
                    return true;
                }
            }
        }
        false
    }

    /// The disjunction rule. An already-asserted disjunct satisfies the
    /// obligation outright; contradicted disjuncts are pruned, folding
    /// the negations' dependencies into the obligation's. One live
    /// disjunct is asserted directly; several open a branch.
    fn apply_disjunction(
        &mut self,
        node: NodeId,
        concept: &Concept,
        disjuncts: &[Concept],
        deps: &DependencySet,
    ) -> Result<RuleOutcome, Halt> {
        let mut live: Vec<Concept> = Vec::new();
        let mut folded = deps.clone();
        for disjunct in disjuncts {
            if self.graph.has_type(node, disjunct) {
                return Ok(RuleOutcome::unchanged());
            }
            match self.graph.get_dependency(node, &disjunct.negated()) {
                Some(neg_deps) => folded = folded.union(neg_deps),
                None => live.push(disjunct.clone()),
            }
        }

        match live.len() {
            0 => Err(Clash::atomic(self.graph.deref(node), concept.clone(), folded).into()),
            1 => {
                debug!(node = %node, disjunct = %live[0], "disjunction: single live disjunct");
                let added = self.graph.add_type(node, &live[0], folded)?;
                Ok(if added {
                    RuleOutcome::changed()
                } else {
                    RuleOutcome::unchanged()
                })
            }
            _ => {
                let alternatives = live.into_iter().map(Alternative::Disjunct).collect();
                self.open_branch(node, alternatives, &folded)?;
                Ok(RuleOutcome::branched())
            }
        }
    }

    fn apply_at_most(
        &mut self,
        node: NodeId,
        n: u32,
        role: &Role,
        deps: &DependencySet,
    ) -> Result<RuleOutcome, Halt> {
        let successors = self.graph.successors(node, role);
        if successors.len() <= n as usize {
            return Ok(RuleOutcome::unchanged());
        }

        let mut folded = deps.clone();
        for (_, edge_deps) in &successors {
            folded = folded.union(edge_deps);
        }
        let rep = self.graph.deref(node);

        if n == 0 {
            return Err(Clash::new(
                rep,
                ClashKind::MaxCardinality {
                    role: role.clone(),
                    bound: 0,
                },
                folded,
            )
            .into());
        }

        // candidate merges: successor pairs not asserted distinct,
        // absorbing the newer node into the older
        let pairs: Vec<Alternative> = successors
            .iter()
            .tuple_combinations()
            .filter(|((a, _), (b, _))| !self.graph.are_distinct(*a, *b))
            .map(|((a, _), (b, _))| {
                let (from, into) = if a.0 > b.0 { (*a, *b) } else { (*b, *a) };
                Alternative::Merge { from, into }
            })
            .collect();

        if pairs.is_empty() {
            for ((a, _), (b, _)) in successors.iter().tuple_combinations() {
                if let Some(distinct_deps) = self.graph.distinct_deps(*a, *b) {
                    folded = folded.union(distinct_deps);
                }
            }
            return Err(Clash::new(
                rep,
                ClashKind::MaxCardinality {
                    role: role.clone(),
                    bound: n,
                },
                folded,
            )
            .into());
        }

        debug!(node = %rep, %role, n, candidates = pairs.len(), "at-most: branching over merges");
        self.open_branch(rep, pairs, &folded)?;
        Ok(RuleOutcome::branched())
    }

    fn apply_nominal(
        &mut self,
        node: NodeId,
        concept: &Concept,
        individuals: &[mimizuku_core::Iri],
        deps: &DependencySet,
    ) -> Result<RuleOutcome, Halt> {
        let rep = self.graph.deref(node);
        if individuals.is_empty() {
            return Err(Clash::atomic(rep, concept.clone(), deps.clone()).into());
        }
        for iri in individuals {
            if let Some(target) = self.graph.named_node(iri) {
                if self.graph.deref(target) == rep {
                    return Ok(RuleOutcome::unchanged());
                }
            }
        }

        let mut alternatives = Vec::with_capacity(individuals.len());
        for iri in individuals {
            let target = self.graph.ensure_named(iri);
            alternatives.push(Alternative::Merge {
                from: rep,
                into: self.graph.deref(target),
            });
        }

        if let [Alternative::Merge { from, into }] = &alternatives[..] {
            self.graph.merge(*from, *into, deps.clone())?;
            return Ok(RuleOutcome::changed());
        }
        self.open_branch(rep, alternatives, deps)?;
        Ok(RuleOutcome::branched())
    }

    /// Joint evaluation of a literal node's restricted value spaces via
    /// the facet oracle. A value space asserted on an individual node is
    /// contradictory on its own.
    fn apply_value_space(&mut self, id: NodeId) -> Result<bool, Halt> {
        let kind = RuleKind::ValueSpace;
        let (start, queue_len) = {
            let node = self.graph.node(id);
            (node.apply_next[kind.index()], node.queue(kind).len())
        };
        if start >= queue_len {
            return Ok(false);
        }

        let node = self.graph.node(id);
        let ranges: Vec<(DataRange, DependencySet)> = node
            .types()
            .filter_map(|(c, d)| match c {
                Concept::ValueSpace(range) => Some((range.clone(), d.clone())),
                _ => None,
            })
            .collect();
        let value = node.literal_value().cloned();
        let is_literal = node.is_literal();

        let mut folded = DependencySet::independent();
        for (_, range_deps) in &ranges {
            folded = folded.union(range_deps);
        }
        let datatype = ranges
            .first()
            .map(|(r, _)| r.datatype.clone())
            .unwrap_or_else(|| mimizuku_core::Iri::new("unknown"));

        if !is_literal {
            return Err(Clash::new(id, ClashKind::EmptyValueSpace(datatype), folded).into());
        }

        let oracle = self.config.value_oracle.clone();
        if let Some(value) = &value {
            for (range, range_deps) in &ranges {
                if !oracle.contains(range, value).map_err(Halt::Fatal)? {
                    return Err(Clash::new(
                        id,
                        ClashKind::EmptyValueSpace(range.datatype.clone()),
                        range_deps.clone(),
                    )
                    .into());
                }
            }
        }

        let refs: Vec<&DataRange> = ranges.iter().map(|(r, _)| r).collect();
        if !oracle.is_satisfiable(&refs).map_err(Halt::Fatal)? {
            return Err(Clash::new(id, ClashKind::EmptyValueSpace(datatype), folded).into());
        }

        self.graph.set_cursor(id, kind.index(), queue_len);
        Ok(false)
    }

    fn open_branch(
        &mut self,
        node: NodeId,
        alternatives: Vec<Alternative>,
        deps: &DependencySet,
    ) -> Result<(), Halt> {
        let ordinal = self.branches.len() as u32 + 1;
        debug!(
            ordinal,
            node = %node,
            alternatives = alternatives.len(),
            "opening branch"
        );
        self.branches.push(Branch::new(
            ordinal,
            node,
            alternatives,
            deps.clone(),
            self.graph.mark(),
            self.graph.len() as u32,
        ));
        self.try_alternative(self.branches.len() - 1)
    }

    fn try_alternative(&mut self, index: usize) -> Result<(), Halt> {
        let (ordinal, node, alternative, alternative_deps, alt_index) = {
            let branch = &mut self.branches[index];
            let alt_index = branch.next_try;
            let alternative = branch.take_next().ok_or_else(|| {
                Halt::Fatal(ReasonerError::Internal(
                    "tried an exhausted branch".to_string(),
                ))
            })?;
            (
                branch.ordinal,
                branch.node,
                alternative,
                branch.alternative_deps(),
                alt_index,
            )
        };
        debug!(ordinal, alternative = %alternative, "committing to alternative");
        self.trace.push((ordinal, node, alt_index));

        match alternative {
            Alternative::Disjunct(concept) => {
                self.graph.add_type(node, &concept, alternative_deps)?;
            }
            Alternative::Merge { from, into } => {
                self.graph.merge(from, into, alternative_deps)?;
            }
        }
        self.flush_events()
    }

    /// Deliver pending graph events to the network, applying the edge
    /// hooks on the way: a new edge receives the source's universal
    /// fillers and re-arms the source's at-most cursor.
    pub(crate) fn flush_events(&mut self) -> Result<(), Halt> {
        loop {
            let events = self.graph.take_events();
            if events.is_empty() {
                return Ok(());
            }
            for wme in events {
                if let Fact::Edge { from, role, to } = &wme.fact {
                    let universals: Vec<(Concept, DependencySet)> = self
                        .graph
                        .node(self.graph.deref(*from))
                        .types()
                        .filter_map(|(c, d)| match c {
                            Concept::All {
                                role: edge_role,
                                filler,
                            } if edge_role == role => Some(((**filler).clone(), d.clone())),
                            _ => None,
                        })
                        .collect();
                    for (filler, type_deps) in universals {
                        self.graph
                            .add_type(*to, &filler, type_deps.union(&wme.deps))?;
                    }
                    self.graph.set_cursor(*from, RuleKind::AtMost.index(), 0);
                }
                self.network.insert(wme);
            }
        }
    }

    /// Assert a network-derived fact into the graph.
    fn assert_derived(&mut self, wme: Wme) -> Result<(), Halt> {
        trace!(fact = %wme.fact, deps = %wme.deps, "asserting derived fact");
        match &wme.fact {
            Fact::Type { node, concept } => {
                self.graph.add_type(*node, concept, wme.deps.clone())?;
            }
            Fact::Edge { from, role, to } => {
                self.graph.add_edge(*from, role.clone(), *to, wme.deps.clone());
            }
        }
        self.flush_events()
    }

    /// Explicit backtracking over the branch stack: resume at the most
    /// recent branch the clash depends on, folding failed alternatives'
    /// dependencies into the clash as branches are exhausted. Returns
    /// false when no branch remains to blame, i.e. the knowledge base is
    /// inconsistent.
    fn backtrack(&mut self, clash: &Clash) -> Result<bool, ReasonerError> {
        let mut deps = clash.deps.clone();
        loop {
            self.timer.check()?;

            let Some(ordinal) = deps.max_branch() else {
                self.last_clash = Some(Clash::new(clash.node, clash.kind.clone(), deps));
                return Ok(false);
            };
            if ordinal == 0 || ordinal as usize > self.branches.len() {
                return Err(ReasonerError::Internal(format!(
                    "clash references unknown branch {ordinal}"
                )));
            }

            // branches above the culprit are abandoned wholesale
            self.branches.truncate(ordinal as usize);
            let index = ordinal as usize - 1;
            let (trail_mark, node_mark) = {
                let branch = &self.branches[index];
                (branch.trail_mark, branch.node_mark)
            };
            self.graph.restore_to(trail_mark);
            self.network.restore(ordinal, node_mark);

            let exhausted = {
                let branch = &mut self.branches[index];
                branch.failure_deps = branch.failure_deps.union(&deps.without_branch(ordinal));
                branch.exhausted()
            };

            if exhausted {
                if let Some(branch) = self.branches.pop() {
                    deps = branch.deps.union(&branch.failure_deps);
                    debug!(ordinal, "branch exhausted; propagating clash");
                }
                continue;
            }

            match self.try_alternative(index) {
                Ok(()) => {
                    debug!(ordinal, "resumed on next alternative");
                    return Ok(true);
                }
                Err(Halt::Clash(next_clash)) => {
                    debug!(clash = %next_clash, "alternative clashed immediately");
                    deps = next_clash.deps;
                }
                Err(Halt::Fatal(e)) => return Err(e),
            }
        }
    }
}
