//! Operation node: one vertex of the dataflow graph.

use crate::interner::InternId;

/// Dense node identity, equal to the node's index in the graph's node array.
pub type NodeId = usize;

/// Dense resource-class identity, assigned in order of first appearance.
pub type ClassId = InternId;

/// A single operation to be scheduled.
///
/// Predecessor and successor links are indices into the owning graph's node
/// array; the graph is the only owner of node lifetime.
#[derive(Clone, Debug)]
pub struct OpNode {
    pub id: NodeId,
    pub name: String,
    /// Raw operation kind as it appeared in the input (e.g. "mul", "MemR").
    pub kind: String,
    pub class: ClassId,
    /// Latency in control steps (>= 1).
    pub delay: u32,
    pub preds: Vec<NodeId>,
    pub succs: Vec<NodeId>,
    /// Earliest feasible start step (inclusive, 1-based).
    pub asap: u32,
    /// Latest feasible start step (inclusive).
    pub alap: u32,
    /// Committed start step; 0 while unscheduled.
    pub step: u32,
    pub incoming: usize,
    pub remaining_incoming: usize,
}

impl OpNode {
    pub(crate) fn new(id: NodeId, name: String, kind: String, class: ClassId, delay: u32) -> Self {
        Self {
            id,
            name,
            kind,
            class,
            delay,
            preds: Vec::new(),
            succs: Vec::new(),
            asap: 0,
            alap: 0,
            step: 0,
            incoming: 0,
            remaining_incoming: 0,
        }
    }

    #[inline]
    pub fn is_scheduled(&self) -> bool {
        self.step != 0
    }

    /// Size of the mobility window `alap - asap + 1`; 0 if the window is empty.
    #[inline]
    pub fn length(&self) -> u32 {
        (self.alap + 1).saturating_sub(self.asap)
    }

    /// Last step occupied when starting at `start`.
    #[inline]
    pub fn finish(&self, start: u32) -> u32 {
        start + self.delay - 1
    }
}
