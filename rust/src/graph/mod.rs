//! Dependency graph of operations.
//!
//! The graph owns every [`OpNode`] in a dense array; all cross references
//! (predecessors, successors, topological order) are indices into that array.
//! Structure is fixed once scheduling begins: only the mobility windows and
//! committed steps of nodes are mutated afterwards, by the scheduler.

mod node;
mod timing;

use thiserror::Error;

use crate::classify::{classify, ResourceClass};
use crate::config::{ConfigError, EdgeDirection, GraphConfig};
use crate::interner::Interner;

pub use node::{ClassId, NodeId, OpNode};

/// Errors raised while building or analysing a dependency graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Edge references unknown vertex: {0}")]
    UnknownVertex(String),
    #[error("Duplicate vertex name: {0}")]
    DuplicateVertex(String),
    #[error("Self-loop on vertex: {0}")]
    SelfLoop(String),
    #[error("Circular dependency detected involving: {0:?}")]
    CircularDependency(Vec<String>),
    #[error("ASAP times must be computed before ALAP times or export")]
    AsapNotComputed,
    #[error("Schedule horizon {horizon} exceeds the supported maximum of {max} steps")]
    HorizonTooLarge { horizon: u64, max: u32 },
    #[error("Graph structure is fixed once timing has been computed: {0}")]
    StructureFrozen(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Dataflow graph plus the timing data derived from it.
#[derive(Clone, Debug)]
pub struct DependencyGraph {
    config: GraphConfig,
    nodes: Vec<OpNode>,
    names: Interner<String>,
    classes: Interner<ResourceClass>,
    /// Number of operations per resource class, indexed by `ClassId`
    resource_counts: Vec<usize>,
    edge_count: usize,
    /// Longest path delay (cdepth); `None` until ASAP is computed
    critical_path_length: Option<u32>,
    /// Schedule horizon `⌊cdepth × LC⌋`
    constrained_latency: u32,
    alap_computed: bool,
    /// Post-order of the ASAP traversal
    dfs_order: Vec<NodeId>,
    /// Order consumed by the scheduling heuristics
    order: Vec<NodeId>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new(config: GraphConfig) -> Result<Self, GraphError> {
        config.validate()?;
        Ok(Self {
            config,
            nodes: Vec::new(),
            names: Interner::default(),
            classes: Interner::default(),
            resource_counts: Vec::new(),
            edge_count: 0,
            critical_path_length: None,
            constrained_latency: 0,
            alap_computed: false,
            dfs_order: Vec::new(),
            order: Vec::new(),
        })
    }

    /// Fail if timing has been computed or any step committed.
    fn ensure_mutable(&self, what: &str) -> Result<(), GraphError> {
        if self.critical_path_length.is_some() || !self.is_unscheduled() {
            return Err(GraphError::StructureFrozen(what.to_string()));
        }
        Ok(())
    }

    /// Add an operation. Its id is the current vertex count.
    pub fn add_vertex(&mut self, name: &str, kind: &str) -> Result<NodeId, GraphError> {
        self.ensure_mutable(name)?;
        if self.names.get(name).is_some() {
            return Err(GraphError::DuplicateVertex(name.to_string()));
        }
        let class = classify(kind);
        let delay = if class.is_wide() {
            self.config.mul_delay
        } else {
            1
        };

        let class_id = self.classes.intern(&class);
        if class_id == self.resource_counts.len() {
            self.resource_counts.push(0);
        }
        self.resource_counts[class_id] += 1;

        let id = self.names.intern(&name.to_string());
        self.nodes.push(OpNode::new(
            id,
            name.to_string(),
            kind.to_string(),
            class_id,
            delay,
        ));
        Ok(id)
    }

    /// Add a dependency `from -> to`, stored according to the edge direction.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        self.ensure_mutable(&format!("{} -> {}", from, to))?;
        let from_id = self
            .find(from)
            .ok_or_else(|| GraphError::UnknownVertex(from.to_string()))?;
        let to_id = self
            .find(to)
            .ok_or_else(|| GraphError::UnknownVertex(to.to_string()))?;
        if from_id == to_id {
            return Err(GraphError::SelfLoop(from.to_string()));
        }

        let (src, dst) = match self.config.direction {
            EdgeDirection::TopDown => (from_id, to_id),
            EdgeDirection::BottomUp => (to_id, from_id),
        };
        self.nodes[src].succs.push(dst);
        self.nodes[dst].preds.push(src);
        self.nodes[dst].incoming += 1;
        self.edge_count += 1;
        Ok(())
    }

    /// Look up a vertex by name.
    #[inline]
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name)
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[OpNode] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &OpNode {
        &self.nodes[id]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut OpNode {
        &mut self.nodes[id]
    }

    pub fn vertex_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Iterate over all stored edges as `(from, to)` ids.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes
            .iter()
            .flat_map(|n| n.succs.iter().map(move |&s| (n.id, s)))
    }

    /// Resource class of a class id.
    pub fn class(&self, class: ClassId) -> &ResourceClass {
        self.classes.key(class)
    }

    /// Resource class of a node.
    pub fn class_of(&self, id: NodeId) -> &ResourceClass {
        self.class(self.nodes[id].class)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Class id of a resource class, if any operation uses it.
    pub fn class_id(&self, class: &ResourceClass) -> Option<ClassId> {
        self.classes.get(class)
    }

    /// Operation count per resource class, in class-id order.
    pub fn resource_counts(&self) -> Vec<(&ResourceClass, usize)> {
        self.classes
            .iter()
            .map(|(id, class)| (class, self.resource_counts[id]))
            .collect()
    }

    /// Longest path delay; `None` until ASAP has been computed.
    pub fn critical_path_length(&self) -> Option<u32> {
        self.critical_path_length
    }

    /// Schedule horizon `⌊cdepth × LC⌋` (0 until ASAP has been computed).
    pub fn constrained_latency(&self) -> u32 {
        self.constrained_latency
    }

    pub fn has_timing(&self) -> bool {
        self.critical_path_length.is_some() && self.alap_computed
    }

    /// Topological order consumed by the scheduling heuristics.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Whether no node has a committed step.
    pub fn is_unscheduled(&self) -> bool {
        self.nodes.iter().all(|n| !n.is_scheduled())
    }

    /// Clear every committed step so the graph can be scheduled again.
    ///
    /// Mobility windows are recomputed by the next scheduling run.
    pub fn reset_schedule(&mut self) {
        for node in &mut self.nodes {
            node.step = 0;
        }
    }
}

/// Build a graph from validated vertex and edge lists.
///
/// Vertices are `(name, kind)` pairs; edges are `(from_name, to_name)` pairs.
pub fn build_graph<S: AsRef<str>>(
    vertices: &[(S, S)],
    edges: &[(S, S)],
    config: GraphConfig,
) -> Result<DependencyGraph, GraphError> {
    let mut graph = DependencyGraph::new(config)?;
    for (name, kind) in vertices {
        graph.add_vertex(name.as_ref(), kind.as_ref())?;
    }
    for (from, to) in edges {
        graph.add_edge(from.as_ref(), to.as_ref())?;
    }
    Ok(graph)
}
