//! Core scheduler: run orchestration and the commit plumbing shared by every
//! heuristic.

use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::{Algorithm, ConfigError, SchedulingConfig};
use crate::feasibility::{find_violations, FeasibilityViolation};
use crate::graph::{ClassId, DependencyGraph, GraphError, NodeId};
use crate::logging::format_profile;
use crate::models::{ResourceUsage, ScheduleResult, ScheduledOp};
use crate::{log_changes, log_checks};

use super::occupancy::OccupancyTable;

/// Errors that can occur during scheduling.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(
        "Scheduling {node} at step {step} (delay {delay}) exceeds the latency horizon {horizon}"
    )]
    ScheduleOverflow {
        node: String,
        step: u32,
        delay: u32,
        horizon: u32,
    },
    #[error("No feasible step left in the mobility window of {0}")]
    EmptyWindow(String),
    #[error("Infeasible schedule: {} violated constraint(s)", .0.len())]
    Infeasible(Vec<FeasibilityViolation>),
    #[error("Graph already carries a schedule; call reset_schedule() first")]
    AlreadyScheduled,
}

/// Entry point: runs one heuristic over a dependency graph.
#[derive(Clone, Debug)]
pub struct Scheduler {
    config: SchedulingConfig,
}

impl Scheduler {
    /// Create a new scheduler after validating its configuration.
    pub fn new(config: SchedulingConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Run the configured algorithm.
    ///
    /// Computes ASAP/ALAP windows, selects the ordering, schedules every
    /// operation and checks the result for precedence violations. The graph
    /// must not carry a previous schedule.
    pub fn schedule(&self, graph: &mut DependencyGraph) -> Result<ScheduleResult, SchedulerError> {
        if !graph.is_unscheduled() {
            return Err(SchedulerError::AlreadyScheduled);
        }
        let started = Instant::now();
        graph.prepare(self.config.ordering)?;

        let verbosity = self.config.verbosity;
        log_changes!(
            verbosity,
            "Scheduling {} operations with {} ({} order), critical path {}, horizon {}",
            graph.vertex_count(),
            self.config.algorithm,
            self.config.ordering,
            graph.critical_path_length().unwrap_or(0),
            graph.constrained_latency()
        );

        let mut run = ScheduleRun::new(graph, &self.config);
        match self.config.algorithm {
            Algorithm::TcEds => run.tc_eds()?,
            Algorithm::TcEdsReverse => run.tc_eds_reverse()?,
            Algorithm::RcEds => run.rc_eds()?,
            Algorithm::TcFds => run.tc_fds()?,
            Algorithm::RcFds => run.rc_fds()?,
        }
        let elapsed = started.elapsed();

        run.verify()?;
        Ok(run.into_result(elapsed))
    }
}

/// Mutable state of a single scheduling run.
pub(super) struct ScheduleRun<'a> {
    pub(super) graph: &'a mut DependencyGraph,
    pub(super) config: &'a SchedulingConfig,
    pub(super) table: OccupancyTable,
    /// Fixed latency ceiling; `None` for resource-constrained runs
    pub(super) ceiling: Option<u32>,
    pub(super) max_latency: u32,
    pub(super) metadata: FxHashMap<String, String>,
}

impl<'a> ScheduleRun<'a> {
    pub(super) fn new(graph: &'a mut DependencyGraph, config: &'a SchedulingConfig) -> Self {
        let horizon = graph.constrained_latency();
        let ceiling = config.algorithm.is_time_constrained().then_some(horizon);
        let table = OccupancyTable::new(graph.class_count(), horizon);
        Self {
            graph,
            config,
            table,
            ceiling,
            max_latency: 0,
            metadata: FxHashMap::default(),
        }
    }

    #[inline]
    pub(super) fn verbosity(&self) -> u8 {
        self.config.verbosity
    }

    /// Per-step unit limit of a class.
    pub(super) fn limit(&self, class: ClassId) -> u32 {
        self.config.limit_for(self.graph.class(class))
    }

    /// Assign `id` to start at `step`, occupying `[step, step + delay - 1]`.
    pub(super) fn commit(&mut self, id: NodeId, step: u32) -> Result<(), SchedulerError> {
        let node = self.graph.node(id);
        let (delay, class) = (node.delay, node.class);
        let finish = node.finish(step);

        if let Some(horizon) = self.ceiling {
            if finish > horizon {
                return Err(SchedulerError::ScheduleOverflow {
                    node: node.name.clone(),
                    step,
                    delay,
                    horizon,
                });
            }
        }

        log_changes!(
            self.verbosity(),
            "  Commit {} ({}) at step {} [{}, {}]",
            node.name,
            self.graph.class(class),
            step,
            node.asap,
            node.alap
        );

        self.table.reserve_span(step, delay, class);
        self.graph.node_mut(id).step = step;
        self.max_latency = self.max_latency.max(finish);
        Ok(())
    }

    /// Commit every operation with no mobility and return the rest in order.
    pub(super) fn place_critical_path(&mut self) -> Result<Vec<NodeId>, SchedulerError> {
        let order = self.graph.order().to_vec();
        let mut deferred = Vec::with_capacity(order.len());
        for id in order {
            let node = self.graph.node(id);
            if node.asap == node.alap {
                let step = node.asap;
                self.commit(id, step)?;
            } else {
                deferred.push(id);
            }
        }
        log_checks!(
            self.verbosity(),
            "  Critical path placed, {} operations deferred",
            deferred.len()
        );
        Ok(deferred)
    }

    /// Earliest start allowed by the window and committed predecessors.
    pub(super) fn lower_bound(&self, id: NodeId) -> u32 {
        let node = self.graph.node(id);
        node.preds
            .iter()
            .map(|&p| self.graph.node(p))
            .filter(|p| p.is_scheduled())
            .map(|p| p.step + p.delay)
            .fold(node.asap, u32::max)
    }

    /// Latest start allowed by the window and committed successors.
    pub(super) fn upper_bound(&self, id: NodeId) -> u32 {
        let node = self.graph.node(id);
        node.succs
            .iter()
            .map(|&s| self.graph.node(s))
            .filter(|s| s.is_scheduled())
            .map(|s| s.step.saturating_sub(node.delay))
            .fold(node.alap, u32::min)
    }

    /// Collapse the window of a committed node to `[step, step]` and shrink
    /// the windows of its unscheduled descendants and ancestors to match.
    ///
    /// With `relax`, a descendant whose ASAP passes its ALAP has the ALAP
    /// pushed out instead of being left with an empty window.
    pub(super) fn shrink_window(&mut self, id: NodeId, step: u32, relax: bool) {
        {
            let node = self.graph.node_mut(id);
            node.asap = step;
            node.alap = step;
        }

        let mut stack = vec![id];
        while let Some(u) = stack.pop() {
            let ready = {
                let node = self.graph.node(u);
                node.asap + node.delay
            };
            for i in 0..self.graph.node(u).succs.len() {
                let s = self.graph.node(u).succs[i];
                let succ = self.graph.node_mut(s);
                if succ.is_scheduled() || ready <= succ.asap {
                    continue;
                }
                succ.asap = ready;
                if relax && succ.asap > succ.alap {
                    succ.alap = succ.asap;
                }
                stack.push(s);
            }
        }

        let mut stack = vec![id];
        while let Some(u) = stack.pop() {
            let alap = self.graph.node(u).alap;
            for i in 0..self.graph.node(u).preds.len() {
                let p = self.graph.node(u).preds[i];
                let pred = self.graph.node_mut(p);
                if pred.is_scheduled() {
                    continue;
                }
                let latest = alap.saturating_sub(pred.delay);
                if latest < pred.alap {
                    pred.alap = latest;
                    stack.push(p);
                }
            }
        }
    }

    /// Fail the run if any precedence constraint is violated.
    pub(super) fn verify(&self) -> Result<(), SchedulerError> {
        let violations = find_violations(&*self.graph);
        if violations.is_empty() {
            return Ok(());
        }
        for violation in &violations {
            log_changes!(self.verbosity(), "  Violation: {}", violation);
        }
        Err(SchedulerError::Infeasible(violations))
    }

    pub(super) fn into_result(mut self, elapsed: Duration) -> ScheduleResult {
        let graph: &DependencyGraph = &*self.graph;

        let ops = graph
            .nodes()
            .iter()
            .map(|n| ScheduledOp {
                id: n.id,
                name: n.name.clone(),
                kind: n.kind.clone(),
                resource_class: graph.class(n.class).to_string(),
                delay: n.delay,
                asap: n.asap,
                alap: n.alap,
                step: n.step,
            })
            .collect();

        let order = graph
            .order()
            .iter()
            .map(|&id| graph.node(id).name.clone())
            .collect();

        let usage: Vec<ResourceUsage> = graph
            .resource_counts()
            .into_iter()
            .enumerate()
            .map(|(class_id, (class, operations))| ResourceUsage {
                resource_class: class.to_string(),
                operations,
                peak: self.table.peak(class_id),
                per_step: self.table.profile(class_id, self.max_latency),
            })
            .collect();
        for u in &usage {
            log_checks!(
                self.config.verbosity,
                "  {}",
                format_profile(&u.resource_class, u.peak, &u.per_step)
            );
        }

        self.metadata
            .insert("algorithm".to_string(), self.config.algorithm.to_string());
        self.metadata
            .insert("ordering".to_string(), self.config.ordering.to_string());
        self.metadata.insert(
            "direction".to_string(),
            graph.config().direction.to_string(),
        );
        self.metadata
            .insert("elapsed_us".to_string(), elapsed.as_micros().to_string());

        ScheduleResult {
            ops,
            order,
            max_latency: self.max_latency,
            critical_path_length: graph.critical_path_length().unwrap_or(0),
            constrained_latency: self.ceiling,
            usage,
            algorithm_metadata: self.metadata,
        }
    }
}
