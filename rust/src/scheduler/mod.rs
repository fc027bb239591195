//! Operation scheduler.
//!
//! One [`Scheduler`] front end dispatches to the entropy-directed (EDS) and
//! force-directed (FDS) heuristics, each in a time-constrained and a
//! resource-constrained flavour. Every run commits operations through the
//! same occupancy table and ends with a feasibility check.

mod core;
mod eds;
mod fds;
mod occupancy;

pub use self::core::{Scheduler, SchedulerError};
pub use fds::DistributionGraph;
pub use occupancy::OccupancyTable;

#[cfg(test)]
pub(crate) mod tests {
    use super::core::ScheduleRun;
    use super::*;
    use crate::config::{Algorithm, GraphConfig, OrderingStrategy, SchedulingConfig};
    use crate::graph::{build_graph, DependencyGraph, GraphError};
    use crate::models::ScheduleResult;

    pub(crate) fn relaxed(latency_factor: f64) -> GraphConfig {
        GraphConfig {
            latency_factor,
            ..GraphConfig::default()
        }
    }

    pub(crate) fn run_with(
        vertices: &[(&str, &str)],
        edges: &[(&str, &str)],
        graph_config: GraphConfig,
        algorithm: Algorithm,
        max_wide_units: u32,
        max_other_units: u32,
    ) -> (DependencyGraph, ScheduleResult) {
        let mut graph = build_graph(vertices, edges, graph_config).unwrap();
        let scheduler = Scheduler::new(SchedulingConfig {
            algorithm,
            max_wide_units,
            max_other_units,
            ..SchedulingConfig::default()
        })
        .unwrap();
        let result = scheduler.schedule(&mut graph).unwrap();
        (graph, result)
    }

    pub(crate) fn run(
        vertices: &[(&str, &str)],
        edges: &[(&str, &str)],
        algorithm: Algorithm,
    ) -> (DependencyGraph, ScheduleResult) {
        run_with(vertices, edges, GraphConfig::default(), algorithm, 1, 1)
    }

    const ALL: [Algorithm; 5] = [
        Algorithm::TcEds,
        Algorithm::TcEdsReverse,
        Algorithm::RcEds,
        Algorithm::TcFds,
        Algorithm::RcFds,
    ];

    const KINDS: [&str; 6] = ["add", "mul", "sub", "lod", "div", "and"];

    /// Deterministic pseudo-random DAG: edges only go from lower to higher index.
    fn random_dag(seed: u64, size: usize) -> (Vec<(String, String)>, Vec<(String, String)>) {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as usize
        };

        let vertices: Vec<(String, String)> = (0..size)
            .map(|i| (format!("v{}", i), KINDS[next() % KINDS.len()].to_string()))
            .collect();
        let mut edges = Vec::new();
        for to in 1..size {
            for from in 0..to {
                if next() % 4 == 0 {
                    edges.push((format!("v{}", from), format!("v{}", to)));
                }
            }
        }
        (vertices, edges)
    }

    fn recount(graph: &DependencyGraph, result: &ScheduleResult) {
        for (class_id, usage) in result.usage.iter().enumerate() {
            for (i, &count) in usage.per_step.iter().enumerate() {
                let step = i as u32 + 1;
                let expected = graph
                    .nodes()
                    .iter()
                    .filter(|n| n.class == class_id && n.step <= step && step <= n.finish(n.step))
                    .count() as u32;
                assert_eq!(count, expected, "{} at step {}", usage.resource_class, step);
            }
        }
    }

    #[test]
    fn test_every_algorithm_on_random_dags() {
        for seed in 1..=6u64 {
            let (vertices, edges) = random_dag(seed, 14);
            for algorithm in ALL {
                for ordering in [OrderingStrategy::Dfs, OrderingStrategy::Kahn] {
                    let mut graph = build_graph(&vertices, &edges, relaxed(1.5)).unwrap();
                    let scheduler = Scheduler::new(SchedulingConfig {
                        algorithm,
                        ordering,
                        max_wide_units: 1,
                        max_other_units: 2,
                        ..SchedulingConfig::default()
                    })
                    .unwrap();
                    let result = scheduler.schedule(&mut graph).unwrap();

                    assert!(crate::feasibility::find_violations(&graph).is_empty());
                    assert!(result.ops.iter().all(|op| op.step >= 1));
                    assert_eq!(
                        result.max_latency,
                        result.ops.iter().map(|op| op.finish()).max().unwrap_or(0)
                    );
                    recount(&graph, &result);

                    if algorithm.is_time_constrained() {
                        let horizon = result.constrained_latency.unwrap();
                        assert!(result.max_latency <= horizon, "{} seed {}", algorithm, seed);
                        assert!(result.max_latency >= result.critical_path_length);
                    } else {
                        for usage in &result.usage {
                            let limit = if usage.resource_class == "WIDE" { 1 } else { 2 };
                            assert!(usage.peak <= limit, "{} seed {}", algorithm, seed);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_fds_windows_collapse_to_steps() {
        let (vertices, edges) = random_dag(42, 10);
        for algorithm in [Algorithm::TcFds, Algorithm::RcFds] {
            let mut graph = build_graph(&vertices, &edges, relaxed(2.0)).unwrap();
            let scheduler = Scheduler::new(SchedulingConfig {
                algorithm,
                ..SchedulingConfig::default()
            })
            .unwrap();
            scheduler.schedule(&mut graph).unwrap();
            for node in graph.nodes() {
                assert_eq!((node.asap, node.alap), (node.step, node.step));
            }
        }
    }

    #[test]
    fn test_second_run_requires_reset() {
        let mut graph = crate::graph::tests::chain_graph();
        let scheduler = Scheduler::new(SchedulingConfig::default()).unwrap();
        scheduler.schedule(&mut graph).unwrap();
        assert!(matches!(
            scheduler.schedule(&mut graph),
            Err(SchedulerError::AlreadyScheduled)
        ));

        graph.reset_schedule();
        let result = scheduler.schedule(&mut graph).unwrap();
        assert_eq!(result.step_of("c"), Some(4));
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let config = SchedulingConfig {
            max_wide_units: 0,
            ..SchedulingConfig::default()
        };
        assert!(matches!(
            Scheduler::new(config),
            Err(SchedulerError::Config(_))
        ));
    }

    #[test]
    fn test_cycle_surfaces_as_graph_error() {
        let mut graph = build_graph(
            &[("a", "add"), ("b", "add")],
            &[("a", "b"), ("b", "a")],
            GraphConfig::default(),
        )
        .unwrap();
        let scheduler = Scheduler::new(SchedulingConfig::default()).unwrap();
        assert!(matches!(
            scheduler.schedule(&mut graph),
            Err(SchedulerError::Graph(_))
        ));
    }

    #[test]
    fn test_huge_latency_factor_fails_cleanly() {
        let mut graph = build_graph(&[("a", "add")], &[], relaxed(1e10)).unwrap();
        let scheduler = Scheduler::new(SchedulingConfig::default()).unwrap();
        assert!(matches!(
            scheduler.schedule(&mut graph),
            Err(SchedulerError::Graph(GraphError::HorizonTooLarge { .. }))
        ));
    }

    #[test]
    fn test_commit_past_horizon_overflows() {
        let mut graph = crate::graph::tests::chain_graph();
        graph.prepare(OrderingStrategy::Dfs).unwrap();
        let config = SchedulingConfig::default();
        let mut run = ScheduleRun::new(&mut graph, &config);
        // the mul occupies steps 4 and 5 against a horizon of 4
        match run.commit(1, 4) {
            Err(SchedulerError::ScheduleOverflow { node, horizon, .. }) => {
                assert_eq!(node, "b");
                assert_eq!(horizon, 4);
            }
            other => panic!("expected overflow, got {:?}", other),
        }
    }

    #[test]
    fn test_result_metadata() {
        let (_, result) = run(&[("a", "add")], &[], Algorithm::RcFds);
        let meta = &result.algorithm_metadata;
        assert_eq!(meta.get("algorithm").map(String::as_str), Some("rc-fds"));
        assert_eq!(meta.get("ordering").map(String::as_str), Some("dfs"));
        assert!(meta.contains_key("elapsed_us"));
        assert_eq!(result.order, vec!["a".to_string()]);
        assert_eq!(result.critical_path_length, 1);
    }

    #[test]
    fn test_empty_graph_schedules_trivially() {
        let (_, result) = run(&[], &[], Algorithm::TcEds);
        assert!(result.ops.is_empty());
        assert_eq!(result.max_latency, 0);
    }
}
