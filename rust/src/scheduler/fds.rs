//! Force-directed scheduling.
//!
//! Each unscheduled operation spreads a probability of `1 / length` over every
//! start step of its window, and committed operations weigh 1 at their step.
//! The per-class sums form the distribution graph; forces compare the average
//! load of a sub-window against that of the full window.

use rustc_hash::FxHashSet;
use std::cmp::Ordering;

use crate::graph::{ClassId, DependencyGraph, NodeId};
use crate::{log_changes, log_checks, log_debug};

use super::core::{ScheduleRun, SchedulerError};

/// Expected number of operations of each class busy at each step.
#[derive(Clone, Debug)]
pub struct DistributionGraph {
    /// `values[class][step]`, 1-based steps
    values: Vec<Vec<f64>>,
}

impl DistributionGraph {
    /// Build the distribution graph from the current windows of `graph`.
    pub fn build(graph: &DependencyGraph) -> Self {
        let last = graph
            .nodes()
            .iter()
            .map(|n| n.alap.max(n.step) + n.delay)
            .max()
            .unwrap_or(0);
        let mut values = vec![vec![0.0; last as usize + 1]; graph.class_count()];

        for node in graph.nodes() {
            let (lo, hi) = if node.is_scheduled() {
                (node.step, node.step)
            } else {
                (node.asap, node.alap)
            };
            if lo > hi {
                continue;
            }
            let probability = 1.0 / f64::from(hi - lo + 1);
            let row = &mut values[node.class];
            for start in lo..=hi {
                for step in start..start + node.delay {
                    row[step as usize] += probability;
                }
            }
        }

        Self { values }
    }

    /// Expected occupancy of `class` at `step`.
    #[inline]
    pub fn at(&self, class: ClassId, step: u32) -> f64 {
        self.values
            .get(class)
            .and_then(|row| row.get(step as usize))
            .copied()
            .unwrap_or(0.0)
    }

    /// Average occupancy of `class` over `[from, to]`; 0 if the range is empty.
    pub fn average(&self, class: ClassId, from: u32, to: u32) -> f64 {
        if from > to {
            return 0.0;
        }
        let sum: f64 = (from..=to).map(|step| self.at(class, step)).sum();
        sum / f64::from(to - from + 1)
    }

    /// Force of restricting an operation from window `[a, b]` to `[x, y]`.
    ///
    /// The average covers every step an operation of `delay` cycles could
    /// occupy, so the upper ends are stretched by `delay - 1`.
    pub fn force(&self, class: ClassId, delay: u32, (a, b): (u32, u32), (x, y): (u32, u32)) -> f64 {
        if x > y || a > b {
            return 0.0;
        }
        self.average(class, x, y + delay - 1) - self.average(class, a, b + delay - 1)
    }
}

/// Force evaluation against one snapshot of the distribution graph.
struct Forces<'a> {
    graph: &'a DependencyGraph,
    dg: &'a DistributionGraph,
}

impl Forces<'_> {
    fn self_force(&self, id: NodeId, step: u32) -> f64 {
        let node = self.graph.node(id);
        self.dg
            .force(node.class, node.delay, (node.asap, node.alap), (step, step))
    }

    /// Self force plus the forces induced on neighbours by starting at `step`.
    fn total_force(&self, id: NodeId, step: u32) -> f64 {
        let mut visited = FxHashSet::default();
        visited.insert(id);
        self.self_force(id, step)
            + self.successor_force(id, step, &mut visited)
            + self.predecessor_force(id, step, &mut visited)
    }

    /// Starting `id` at `step` pushes same-class successors to start no
    /// earlier than `step + delay`.
    fn successor_force(&self, id: NodeId, step: u32, visited: &mut FxHashSet<NodeId>) -> f64 {
        let node = self.graph.node(id);
        let boundary = step + node.delay;
        let mut force = 0.0;

        for &s in &node.succs {
            let succ = self.graph.node(s);
            if succ.is_scheduled() || succ.class != node.class {
                continue;
            }
            if !(succ.asap < boundary && boundary <= succ.alap) {
                continue;
            }
            if !visited.insert(s) {
                continue;
            }
            force += self.self_force(s, boundary);
            if boundary == succ.alap {
                force += self.successor_force(s, boundary, visited);
            }
        }
        force
    }

    /// Starting `id` at `step` caps same-class predecessors at
    /// `step - delay(pred)`.
    fn predecessor_force(&self, id: NodeId, step: u32, visited: &mut FxHashSet<NodeId>) -> f64 {
        let node = self.graph.node(id);
        let mut force = 0.0;

        for &p in &node.preds {
            let pred = self.graph.node(p);
            if pred.is_scheduled() || pred.class != node.class {
                continue;
            }
            let Some(boundary) = step.checked_sub(pred.delay) else {
                continue;
            };
            if !(pred.asap <= boundary && boundary < pred.alap) {
                continue;
            }
            if !visited.insert(p) {
                continue;
            }
            force += self.self_force(p, boundary);
            if boundary == pred.asap {
                force += self.predecessor_force(p, boundary, visited);
            }
        }
        force
    }
}

/// Compare two f64 values, treating NaN as equal.
#[inline]
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Forces closer than this are treated as ties.
const FORCE_EPSILON: f64 = 1e-12;

impl ScheduleRun<'_> {
    /// Time-constrained FDS: commit the globally cheapest (operation, step)
    /// pair, one operation per iteration.
    pub(super) fn tc_fds(&mut self) -> Result<(), SchedulerError> {
        let order = self.graph.order().to_vec();
        let mut remaining = order.len();

        while remaining > 0 {
            let dg = DistributionGraph::build(&*self.graph);
            let best = {
                let forces = Forces {
                    graph: &*self.graph,
                    dg: &dg,
                };
                let mut best: Option<(NodeId, u32, f64)> = None;
                for &id in &order {
                    let node = self.graph.node(id);
                    if node.is_scheduled() {
                        continue;
                    }
                    for step in node.asap..=node.alap {
                        let force = forces.total_force(id, step);
                        log_debug!(self.verbosity(), "    {} @ {}: force {:.4}", node.name, step, force);
                        if best.map_or(true, |(_, _, f)| force < f - FORCE_EPSILON) {
                            best = Some((id, step, force));
                        }
                    }
                }
                best
            };

            let Some((id, step, force)) = best else {
                let name = order
                    .iter()
                    .map(|&id| self.graph.node(id))
                    .find(|n| !n.is_scheduled())
                    .map(|n| n.name.clone())
                    .unwrap_or_default();
                return Err(SchedulerError::EmptyWindow(name));
            };

            log_checks!(
                self.verbosity(),
                "  Lowest force {:.4}: {} at step {}",
                force,
                self.graph.node(id).name,
                step
            );
            self.commit(id, step)?;
            self.shrink_window(id, step, false);
            remaining -= 1;
        }
        Ok(())
    }

    /// Resource-constrained FDS: list scheduling step by step, with ready
    /// operations prioritised by descending force and the horizon extended
    /// whenever the current step passes it.
    pub(super) fn rc_fds(&mut self) -> Result<(), SchedulerError> {
        let order = self.graph.order().to_vec();
        let mut remaining = order.len();
        let mut horizon = self.graph.constrained_latency();
        let mut step = 0;

        while remaining > 0 {
            step += 1;
            if step > horizon {
                horizon += 1;
                for &id in &order {
                    let node = self.graph.node_mut(id);
                    if !node.is_scheduled() {
                        node.alap += 1;
                    }
                }
                log_changes!(self.verbosity(), "  Horizon extended to {}", horizon);
            }

            // nothing unscheduled may start before the current step
            for &id in &order {
                let node = self.graph.node_mut(id);
                if !node.is_scheduled() {
                    node.asap = node.asap.max(step);
                    node.alap = node.alap.max(node.asap);
                }
            }

            let dg = DistributionGraph::build(&*self.graph);
            let mut ready: Vec<(NodeId, f64)> = {
                let forces = Forces {
                    graph: &*self.graph,
                    dg: &dg,
                };
                order
                    .iter()
                    .copied()
                    .filter(|&id| {
                        let node = self.graph.node(id);
                        !node.is_scheduled()
                            && node.asap <= step
                            && node.preds.iter().all(|&p| self.graph.node(p).is_scheduled())
                    })
                    .map(|id| (id, forces.total_force(id, step)))
                    .collect()
            };
            ready.sort_by(|a, b| cmp_f64(b.1, a.1));

            for (id, force) in ready {
                let (delay, class) = {
                    let node = self.graph.node(id);
                    (node.delay, node.class)
                };
                let limit = self.limit(class);
                if !self.table.fits(step, delay, class, limit) {
                    log_checks!(
                        self.verbosity(),
                        "  {} waits at step {} (force {:.4}, limit {})",
                        self.graph.node(id).name,
                        step,
                        force,
                        limit
                    );
                    continue;
                }
                self.commit(id, step)?;
                self.shrink_window(id, step, true);
                remaining -= 1;
            }
        }

        self.metadata
            .insert("final_horizon".to_string(), horizon.to_string());
        Ok(())
    }
}
