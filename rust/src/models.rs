//! Read-only result types handed to reporting and export collaborators.

use rustc_hash::FxHashMap;

/// One operation with its final window and committed step.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledOp {
    pub id: usize,
    pub name: String,
    pub kind: String,
    /// Canonical resource class name ("WIDE", "NARROW", or the raw kind)
    pub resource_class: String,
    pub delay: u32,
    pub asap: u32,
    pub alap: u32,
    pub step: u32,
}

impl ScheduledOp {
    /// Last step this operation occupies.
    pub fn finish(&self) -> u32 {
        self.step + self.delay - 1
    }
}

/// Usage of one resource class across the schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceUsage {
    pub resource_class: String,
    /// Number of operations of this class in the graph
    pub operations: usize,
    /// Maximum occupancy observed at any step
    pub peak: u32,
    /// Occupancy for steps `1..=max_latency`
    pub per_step: Vec<u32>,
}

/// Result from a scheduling run.
#[derive(Clone, Debug, Default)]
pub struct ScheduleResult {
    /// Operations in id order
    pub ops: Vec<ScheduledOp>,
    /// Names in the topological order the heuristic consumed
    pub order: Vec<String>,
    /// `max(step + delay - 1)` over all operations
    pub max_latency: u32,
    /// Longest path delay of the graph (cdepth)
    pub critical_path_length: u32,
    /// Horizon the run was bound by; `None` for resource-constrained runs
    pub constrained_latency: Option<u32>,
    /// Usage per resource class, in class order
    pub usage: Vec<ResourceUsage>,
    pub algorithm_metadata: FxHashMap<String, String>,
}

impl ScheduleResult {
    /// Look up an operation by name.
    pub fn op(&self, name: &str) -> Option<&ScheduledOp> {
        self.ops.iter().find(|op| op.name == name)
    }

    /// Committed step of an operation by name.
    pub fn step_of(&self, name: &str) -> Option<u32> {
        self.op(name).map(|op| op.step)
    }

    /// Peak occupancy per resource class.
    pub fn peak_occupancy(&self) -> FxHashMap<String, u32> {
        self.usage
            .iter()
            .map(|u| (u.resource_class.clone(), u.peak))
            .collect()
    }
}
