//! Operation scheduling for high-level synthesis.
//!
//! Builds a dependency graph of dataflow operations, computes their ASAP/ALAP
//! mobility windows and assigns each one a control step with entropy-directed
//! or force-directed heuristics, under either a latency or a resource budget.

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

pub mod classify;
pub mod config;
pub mod export;
pub mod feasibility;
pub mod graph;
mod interner;
pub mod logging;
pub mod models;
pub mod parser;
pub mod scheduler;

#[cfg(feature = "python")]
mod python;

pub use classify::{classify, ResourceClass};
pub use config::{
    Algorithm, ConfigError, EdgeDirection, GraphConfig, OrderingStrategy, SchedulingConfig,
};
pub use export::{resource_constrained_lp, time_constrained_lp};
pub use feasibility::{find_violations, is_feasible, FeasibilityViolation};
pub use graph::{build_graph, ClassId, DependencyGraph, GraphError, NodeId, OpNode};
pub use models::{ResourceUsage, ScheduleResult, ScheduledOp};
pub use parser::{parse_dot, DotGraph, ParseError};
pub use scheduler::{DistributionGraph, OccupancyTable, Scheduler, SchedulerError};

/// Build a graph from `(name, kind)` vertices and `(from, to)` edges and
/// schedule it in one call.
pub fn schedule_graph<S: AsRef<str>>(
    vertices: &[(S, S)],
    edges: &[(S, S)],
    graph_config: GraphConfig,
    config: &SchedulingConfig,
) -> Result<ScheduleResult, SchedulerError> {
    let mut graph = build_graph(vertices, edges, graph_config)?;
    Scheduler::new(config.clone())?.schedule(&mut graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_graph_end_to_end() {
        let config = SchedulingConfig {
            algorithm: Algorithm::TcFds,
            ..SchedulingConfig::default()
        };
        let result = schedule_graph(
            &[("a", "add"), ("b", "mul"), ("c", "sub")],
            &[("a", "b"), ("b", "c")],
            GraphConfig::default(),
            &config,
        )
        .unwrap();
        assert_eq!(result.step_of("b"), Some(2));
        assert_eq!(result.max_latency, 4);
    }

    #[test]
    fn test_schedule_graph_reports_unknown_vertex() {
        let err = schedule_graph(
            &[("a", "add")],
            &[("a", "z")],
            GraphConfig::default(),
            &SchedulingConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Graph(GraphError::UnknownVertex(ref name)) if name == "z"
        ));
    }
}
