//! Dependency graph construction and cycle detection.
//!
//! Nodes are models (`Order`), members (`Order::total`) and components.
//! Adjacency is kept in insertion order, which follows declaration order, so
//! every traversal is deterministic.

use indexmap::{IndexMap, IndexSet};
use rxgen_core::{Declarations, ModelDescriptor, SourceLocation};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Identifier of a graph node.
pub type NodeId = String;

/// Relation carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Model holds a reference to another model.
    Reference,
    /// Derived model extends a base model.
    Inherits,
    /// Property change invokes a command.
    Trigger,
    /// Command execution writes a property.
    Writes,
    /// Component observes a model.
    Observer,
}

impl EdgeKind {
    /// Edge kinds that make up the model graph.
    pub const MODEL: &'static [EdgeKind] = &[EdgeKind::Reference, EdgeKind::Inherits];
    /// Edge kinds that make up the command trigger graph.
    pub const TRIGGER: &'static [EdgeKind] = &[EdgeKind::Trigger, EdgeKind::Writes];
}

/// One directed edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    /// Where the edge is declared.
    pub location: SourceLocation,
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A strongly connected set of nodes: each reaches every other one.
///
/// A simple ring keeps its traversal order. Overlapping cycles share one
/// `Cycle` holding every node involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub nodes: Vec<NodeId>,
    /// Every edge between two nodes of the cycle.
    pub edges: Vec<DependencyEdge>,
}

impl Cycle {
    pub fn contains(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| n == node)
    }

    /// Whether the nodes form a single ring (or a self-loop).
    pub fn is_ring(&self) -> bool {
        self.edges.len() == self.nodes.len()
    }

    /// `A -> B -> A` for a ring, `A, B, C form overlapping cycles` otherwise.
    pub fn describe(&self) -> String {
        if !self.is_ring() {
            return format!("{} form overlapping cycles", self.nodes.join(", "));
        }
        let mut path = self.nodes.clone();
        if let Some(first) = self.nodes.first() {
            path.push(first.clone());
        }
        path.join(" -> ")
    }
}

/// Tarjan bookkeeping for one `find_cycles` pass.
#[derive(Default)]
struct Components<'g> {
    next: usize,
    index: IndexMap<&'g str, usize>,
    low: IndexMap<&'g str, usize>,
    stack: Vec<&'g str>,
    on_stack: IndexSet<&'g str>,
    found: Vec<Vec<&'g str>>,
}

/// Graph over every descriptor of one compilation.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: IndexSet<NodeId>,
    adjacency: IndexMap<NodeId, Vec<DependencyEdge>>,
}

/// Node id of a model member.
pub fn member_node(model: &str, member: &str) -> NodeId {
    format!("{}::{}", model, member)
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a set of declarations.
    pub fn build(declarations: &Declarations) -> Self {
        let mut graph = Self::new();
        for model in &declarations.models {
            graph.add_node(&model.name);
        }
        for model in &declarations.models {
            graph.add_model_edges(model);
            graph.add_trigger_edges(model, declarations);
        }
        for component in &declarations.components {
            graph.add_node(&component.name);
            graph.add_edge(DependencyEdge {
                from: component.name.clone(),
                to: component.model.clone(),
                kind: EdgeKind::Observer,
                location: component.location(),
            });
        }
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edge_count(),
            "dependency graph built"
        );
        graph
    }

    fn add_model_edges(&mut self, model: &ModelDescriptor) {
        if let Some(base) = &model.base_model {
            self.add_edge(DependencyEdge {
                from: model.name.clone(),
                to: base.clone(),
                kind: EdgeKind::Inherits,
                location: model.location(),
            });
        }
        for reference in &model.references {
            self.add_edge(DependencyEdge {
                from: model.name.clone(),
                to: reference.model.clone(),
                kind: EdgeKind::Reference,
                location: model.location_of(reference.span),
            });
        }
    }

    fn add_trigger_edges(&mut self, model: &ModelDescriptor, declarations: &Declarations) {
        for command in &model.commands {
            let command_node = member_node(&model.name, &command.name);

            // Property (local or through a reference) -> command
            for trigger in &command.triggers {
                let property = match &trigger.path.reference {
                    None => member_node(&model.name, &trigger.path.property),
                    Some(reference) => match model.reference(reference) {
                        Some(r) => member_node(&r.model, &trigger.path.property),
                        None => continue,
                    },
                };
                self.add_edge(DependencyEdge {
                    from: property,
                    to: command_node.clone(),
                    kind: EdgeKind::Trigger,
                    location: model.location_of(trigger.span),
                });
            }

            // Command -> every property its execution writes
            let access = model.transitive_access(&command.execute);
            let mut written: BTreeSet<NodeId> = access
                .written_members()
                .into_iter()
                .map(|member| member_node(&model.name, &member))
                .collect();
            for path in access.reference_writes() {
                let target = path
                    .reference
                    .as_deref()
                    .and_then(|r| model.reference(r))
                    .and_then(|r| declarations.model(&r.model));
                if let Some(target) = target {
                    written.insert(member_node(&target.name, &path.property));
                }
            }
            for property in written {
                self.add_edge(DependencyEdge {
                    from: command_node.clone(),
                    to: property,
                    kind: EdgeKind::Writes,
                    location: model.location_of(command.span),
                });
            }
        }
    }

    pub fn add_node(&mut self, node: &str) {
        if self.nodes.insert(node.to_string()) {
            self.adjacency.insert(node.to_string(), Vec::new());
        }
    }

    pub fn add_edge(&mut self, edge: DependencyEdge) {
        self.add_node(&edge.from);
        self.add_node(&edge.to);
        if let Some(edges) = self.adjacency.get_mut(&edge.from) {
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// Outgoing edges of a node.
    pub fn edges_from(&self, node: &str) -> &[DependencyEdge] {
        self.adjacency
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.adjacency.values().flatten()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Every strongly connected component formed by edges of the given kinds
    /// that contains a cycle.
    ///
    /// Self-loops are reported as one-node cycles. Cycles are ordered by their
    /// earliest declared node.
    pub fn find_cycles(&self, kinds: &[EdgeKind]) -> Vec<Cycle> {
        let mut state = Components::default();
        for node in &self.nodes {
            if !state.index.contains_key(node.as_str()) {
                self.connect(node, kinds, &mut state);
            }
        }

        let mut cycles: Vec<(usize, Cycle)> = state
            .found
            .into_iter()
            .filter_map(|members| self.cycle_of(&members, kinds))
            .collect();
        cycles.sort_by_key(|(first, _)| *first);
        cycles.into_iter().map(|(_, cycle)| cycle).collect()
    }

    fn connect<'g>(&'g self, node: &'g str, kinds: &[EdgeKind], state: &mut Components<'g>) {
        let index = state.next;
        state.next += 1;
        state.index.insert(node, index);
        state.low.insert(node, index);
        state.stack.push(node);
        state.on_stack.insert(node);

        for edge in self.edges_from(node) {
            if !kinds.contains(&edge.kind) {
                continue;
            }
            let target = edge.to.as_str();
            let reached = match state.index.get(target).copied() {
                None => {
                    self.connect(target, kinds, state);
                    state.low.get(target).copied()
                }
                Some(target_index) if state.on_stack.contains(target) => Some(target_index),
                Some(_) => None,
            };
            if let (Some(reached), Some(low)) = (reached, state.low.get_mut(node)) {
                *low = (*low).min(reached);
            }
        }

        if state.low.get(node) == Some(&index) {
            let mut members = Vec::new();
            while let Some(member) = state.stack.pop() {
                state.on_stack.swap_remove(member);
                members.push(member);
                if member == node {
                    break;
                }
            }
            state.found.push(members);
        }
    }

    /// The cycle formed by one strongly connected component, keyed by the
    /// declaration position of its earliest node.
    fn cycle_of(&self, members: &[&str], kinds: &[EdgeKind]) -> Option<(usize, Cycle)> {
        let (first, start) = members
            .iter()
            .filter_map(|m| self.nodes.get_index_of(*m).map(|i| (i, *m)))
            .min()?;
        let members: IndexSet<&str> = members.iter().copied().collect();

        let mut order: IndexSet<&str> = IndexSet::new();
        self.walk(start, kinds, &members, &mut order);
        let edges: Vec<DependencyEdge> = order
            .iter()
            .flat_map(|node| self.edges_from(node))
            .filter(|e| kinds.contains(&e.kind) && members.contains(e.to.as_str()))
            .cloned()
            .collect();
        if edges.is_empty() {
            return None;
        }

        let nodes = order.into_iter().map(str::to_string).collect();
        Some((first, Cycle { nodes, edges }))
    }

    /// Depth-first visit order of `members`, starting at `node`.
    fn walk<'g>(
        &'g self,
        node: &'g str,
        kinds: &[EdgeKind],
        members: &IndexSet<&str>,
        order: &mut IndexSet<&'g str>,
    ) {
        if !order.insert(node) {
            return;
        }
        for edge in self.edges_from(node) {
            if kinds.contains(&edge.kind) && members.contains(edge.to.as_str()) {
                self.walk(&edge.to, kinds, members, order);
            }
        }
    }

    /// Nodes ordered so that every node follows the nodes it depends on
    /// through edges of the given kinds. Back edges are ignored.
    pub fn topological_order(&self, kinds: &[EdgeKind]) -> Vec<NodeId> {
        let mut visited: IndexSet<&str> = IndexSet::new();
        let mut order = Vec::new();
        for node in &self.nodes {
            self.post_order(node, kinds, &mut visited, &mut order);
        }
        order
    }

    fn post_order<'g>(
        &'g self,
        node: &'g str,
        kinds: &[EdgeKind],
        visited: &mut IndexSet<&'g str>,
        order: &mut Vec<NodeId>,
    ) {
        if !visited.insert(node) {
            return;
        }
        for edge in self.edges_from(node) {
            if kinds.contains(&edge.kind) {
                self.post_order(&edge.to, kinds, visited, order);
            }
        }
        order.push(node.to_string());
    }
}
