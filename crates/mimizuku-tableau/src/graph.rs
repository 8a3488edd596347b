//! The completion graph: node arena, merges, and the reversible trail

use crate::node::{Edge, Node, NodeName};
use indexmap::IndexMap;
use mimizuku_core::{Clash, ClashKind, Concept, DependencySet, Iri, Literal, NodeId, Role};
use mimizuku_rete::{Fact, Wme};
use tracing::trace;

/// One undoable graph mutation. The trail is strictly LIFO: restoring to
/// a mark pops entries in reverse order, so per-node collections can be
/// unwound with plain `pop`s.
#[derive(Debug, Clone)]
pub(crate) enum TrailEntry {
    TypeAdded { node: NodeId, concept: Concept },
    EdgeAdded { node: NodeId },
    NodeAdded { node: NodeId },
    Merged { node: NodeId },
    DistinctAdded { node: NodeId },
    CursorMoved { node: NodeId, kind: usize, prev: usize },
}

/// Arena of nodes addressed by stable indices. Merging never unites
/// objects physically; it rewrites a redirect on the absorbed node and
/// copies its obligations onto the representative.
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    nodes: Vec<Node>,
    named: IndexMap<Iri, NodeId>,
    literals: IndexMap<Literal, NodeId>,
    anon_count: u32,
    trail: Vec<TrailEntry>,
    /// Facts produced by mutations, awaiting delivery to the network
    events: Vec<Wme>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn named_node(&self, iri: &Iri) -> Option<NodeId> {
        self.named.get(iri).copied()
    }

    /// Follow merge redirects to the representative.
    pub fn deref(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(next) = self.nodes[current.index()].merged_into {
            current = next;
        }
        current
    }

    pub fn ensure_named(&mut self, iri: &Iri) -> NodeId {
        if let Some(id) = self.named.get(iri) {
            return *id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes
            .push(Node::new(id, NodeName::Named(iri.clone()), None, 0));
        self.named.insert(iri.clone(), id);
        self.trail.push(TrailEntry::NodeAdded { node: id });
        id
    }

    pub fn ensure_literal(&mut self, value: &Literal) -> NodeId {
        if let Some(id) = self.literals.get(value) {
            return *id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes
            .push(Node::new(id, NodeName::Literal(value.clone()), None, 0));
        self.literals.insert(value.clone(), id);
        self.trail.push(TrailEntry::NodeAdded { node: id });
        id
    }

    pub fn create_anonymous(&mut self, predecessor: NodeId) -> NodeId {
        let depth = self.node(predecessor).depth + 1;
        let id = NodeId(self.nodes.len() as u32);
        let name = NodeName::Anonymous(self.anon_count);
        self.anon_count += 1;
        self.nodes
            .push(Node::new(id, name, Some(predecessor), depth));
        self.trail.push(TrailEntry::NodeAdded { node: id });
        id
    }

    pub fn create_anonymous_literal(&mut self, predecessor: NodeId) -> NodeId {
        let depth = self.node(predecessor).depth + 1;
        let id = NodeId(self.nodes.len() as u32);
        let name = NodeName::AnonymousLiteral(self.anon_count);
        self.anon_count += 1;
        self.nodes
            .push(Node::new(id, name, Some(predecessor), depth));
        self.trail.push(TrailEntry::NodeAdded { node: id });
        id
    }

    /// Assert `node : concept`. Detects the atomic clashes (⊥, or a
    /// concept alongside its negation) at insertion time.
    ///
    /// Returns `Ok(true)` when the type is new; every new type is logged
    /// on the trail and emitted to the network.
    pub fn add_type(
        &mut self,
        node: NodeId,
        concept: &Concept,
        deps: DependencySet,
    ) -> Result<bool, Clash> {
        let rep = self.deref(node);
        if *concept == Concept::Thing {
            return Ok(false);
        }
        if self.node(rep).has_type(concept) {
            return Ok(false);
        }
        if *concept == Concept::Nothing {
            return Err(Clash::new(rep, ClashKind::Bottom, deps));
        }
        if let Some(neg_deps) = self.node(rep).type_deps(&concept.negated()) {
            return Err(Clash::atomic(rep, concept.clone(), deps.union(neg_deps)));
        }

        trace!(node = %rep, %concept, %deps, "add type");
        self.node_mut(rep).insert_type(concept.clone(), deps.clone());
        self.trail.push(TrailEntry::TypeAdded {
            node: rep,
            concept: concept.clone(),
        });
        self.events.push(Wme::new(
            Fact::Type {
                node: rep,
                concept: concept.clone(),
            },
            deps,
        ));
        Ok(true)
    }

    /// Assert an edge. Returns `true` when the edge is new.
    pub fn add_edge(&mut self, from: NodeId, role: Role, to: NodeId, deps: DependencySet) -> bool {
        let from = self.deref(from);
        let to = self.deref(to);
        let exists = self
            .node(from)
            .out_edges()
            .iter()
            .any(|e| e.role == role && self.deref(e.to) == to);
        if exists {
            return false;
        }

        trace!(%from, %role, %to, %deps, "add edge");
        self.node_mut(from).push_edge(Edge {
            role: role.clone(),
            to,
            deps: deps.clone(),
        });
        self.node_mut(to).push_in_edge(from);
        self.trail.push(TrailEntry::EdgeAdded { node: from });
        self.events.push(Wme::new(Fact::Edge { from, role, to }, deps));
        true
    }

    /// Record that two individuals are distinct; merging them later is a
    /// clash.
    pub fn add_distinct(
        &mut self,
        first: NodeId,
        second: NodeId,
        deps: DependencySet,
    ) -> Result<bool, Clash> {
        let a = self.deref(first);
        let b = self.deref(second);
        if a == b {
            return Err(Clash::new(a, ClashKind::MergedDistinct, deps));
        }
        if self.distinct_deps(a, b).is_some() {
            return Ok(false);
        }
        self.node_mut(a).push_distinct(b, deps.clone());
        self.trail.push(TrailEntry::DistinctAdded { node: a });
        self.node_mut(b).push_distinct(a, deps);
        self.trail.push(TrailEntry::DistinctAdded { node: b });
        Ok(true)
    }

    pub fn are_distinct(&self, first: NodeId, second: NodeId) -> bool {
        self.distinct_deps(first, second).is_some()
    }

    pub fn distinct_deps(&self, first: NodeId, second: NodeId) -> Option<&DependencySet> {
        let a = self.deref(first);
        let b = self.deref(second);
        self.node(a)
            .distincts()
            .iter()
            .find(|(other, _)| self.deref(*other) == b)
            .map(|(_, deps)| deps)
    }

    /// Merge `from` into `into`: redirect `from`, union its types, edges
    /// and distinctness records onto the representative, and rewrite
    /// incoming edges. Fails with a clash when the two nodes are asserted
    /// distinct or carry contradictory types.
    pub fn merge(
        &mut self,
        from: NodeId,
        into: NodeId,
        deps: DependencySet,
    ) -> Result<(), Clash> {
        let from = self.deref(from);
        let into = self.deref(into);
        if from == into {
            return Ok(());
        }
        if let Some(distinct_deps) = self.distinct_deps(from, into) {
            return Err(Clash::new(
                into,
                ClashKind::MergedDistinct,
                deps.union(distinct_deps),
            ));
        }

        trace!(%from, %into, %deps, "merge");
        self.node_mut(from).merged_into = Some(into);
        self.trail.push(TrailEntry::Merged { node: from });

        // union the absorbed node's obligations into the representative
        let types: Vec<(Concept, DependencySet)> = self
            .node(from)
            .types()
            .map(|(c, d)| (c.clone(), d.clone()))
            .collect();
        for (concept, type_deps) in types {
            self.add_type(into, &concept, type_deps.union(&deps))?;
        }

        let edges: Vec<Edge> = self.node(from).out_edges().to_vec();
        for edge in edges {
            self.add_edge(into, edge.role, edge.to, edge.deps.union(&deps));
        }

        // rewrite edges pointing at the absorbed node
        let sources: Vec<NodeId> = self.node(from).in_edges().to_vec();
        for source in sources {
            let source = self.deref(source);
            let incoming: Vec<Edge> = self
                .node(source)
                .out_edges()
                .iter()
                .filter(|e| e.to == from)
                .cloned()
                .collect();
            for edge in incoming {
                self.add_edge(source, edge.role, into, edge.deps.union(&deps));
            }
        }

        let distincts: Vec<(NodeId, DependencySet)> = self.node(from).distincts().to_vec();
        for (other, distinct_deps) in distincts {
            self.add_distinct(into, other, distinct_deps.union(&deps))?;
        }
        Ok(())
    }

    pub fn has_type(&self, node: NodeId, concept: &Concept) -> bool {
        self.node(self.deref(node)).has_type(concept)
    }

    pub fn get_dependency(&self, node: NodeId, concept: &Concept) -> Option<&DependencySet> {
        self.node(self.deref(node)).type_deps(concept)
    }

    /// Distinct successor representatives over `role`, in edge insertion
    /// order, with the edge dependency sets.
    pub fn successors(&self, node: NodeId, role: &Role) -> Vec<(NodeId, DependencySet)> {
        let rep = self.deref(node);
        let mut out: Vec<(NodeId, DependencySet)> = Vec::new();
        for edge in self.node(rep).out_edges() {
            if edge.role != *role {
                continue;
            }
            let to = self.deref(edge.to);
            if out.iter().all(|(seen, _)| *seen != to) {
                out.push((to, edge.deps.clone()));
            }
        }
        out
    }

    /// Move a rule cursor, logging the previous position for undo.
    pub(crate) fn set_cursor(&mut self, node: NodeId, kind: usize, value: usize) {
        let rep = self.deref(node);
        let prev = self.node(rep).apply_next[kind];
        if prev == value {
            return;
        }
        self.trail.push(TrailEntry::CursorMoved {
            node: rep,
            kind,
            prev,
        });
        self.node_mut(rep).apply_next[kind] = value;
    }

    /// Current trail position; branches snapshot this before committing
    /// to an alternative.
    pub fn mark(&self) -> usize {
        self.trail.len()
    }

    /// Undo every mutation after `mark`, most recent first.
    pub fn restore_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let entry = match self.trail.pop() {
                Some(entry) => entry,
                None => break,
            };
            match entry {
                TrailEntry::TypeAdded { node, concept } => {
                    self.node_mut(node).pop_type(&concept);
                }
                TrailEntry::EdgeAdded { node } => {
                    if let Some(edge) = self.node_mut(node).pop_edge() {
                        self.node_mut(edge.to).pop_in_edge();
                    }
                }
                TrailEntry::NodeAdded { node } => {
                    let removed = self.nodes.pop();
                    debug_assert_eq!(removed.as_ref().map(|n| n.id), Some(node));
                    if let Some(removed) = removed {
                        match removed.name {
                            NodeName::Named(_) => {
                                self.named.pop();
                            }
                            NodeName::Literal(_) => {
                                self.literals.pop();
                            }
                            NodeName::Anonymous(_) | NodeName::AnonymousLiteral(_) => {
                                self.anon_count -= 1;
                            }
                        }
                    }
                }
                TrailEntry::Merged { node } => {
                    self.node_mut(node).merged_into = None;
                }
                TrailEntry::DistinctAdded { node } => {
                    self.node_mut(node).pop_distinct();
                }
                TrailEntry::CursorMoved { node, kind, prev } => {
                    self.node_mut(node).apply_next[kind] = prev;
                }
            }
        }
        self.events.clear();
    }

    /// Drain pending network notifications.
    pub fn take_events(&mut self) -> Vec<Wme> {
        std::mem::take(&mut self.events)
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}
