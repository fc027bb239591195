//! Post-hoc validation of a completed schedule.
//!
//! A schedule is feasible when every operation has a committed step and every
//! dependency `u -> v` satisfies `step(u) + delay(u) - 1 < step(v)`.

use std::fmt;

use crate::graph::{DependencyGraph, NodeId};

/// A single violated constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeasibilityViolation {
    /// An operation was never assigned a step.
    Unscheduled { node: NodeId, name: String },
    /// `to` starts before `from` has finished.
    Precedence {
        from: NodeId,
        to: NodeId,
        from_name: String,
        to_name: String,
        /// Last step occupied by `from`
        from_finish: u32,
        to_start: u32,
    },
}

impl fmt::Display for FeasibilityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unscheduled { node, name } => {
                write!(f, "{} (#{}) has no committed step", name, node)
            }
            Self::Precedence {
                from,
                to,
                from_name,
                to_name,
                from_finish,
                to_start,
            } => write!(
                f,
                "{} (#{}) finishes at step {} but successor {} (#{}) starts at step {}",
                from_name, from, from_finish, to_name, to, to_start
            ),
        }
    }
}

/// Enumerate every violated constraint of the committed schedule.
pub fn find_violations(graph: &DependencyGraph) -> Vec<FeasibilityViolation> {
    let mut violations = Vec::new();

    for node in graph.nodes() {
        if !node.is_scheduled() {
            violations.push(FeasibilityViolation::Unscheduled {
                node: node.id,
                name: node.name.clone(),
            });
        }
    }

    for (u, v) in graph.edges() {
        let (from, to) = (graph.node(u), graph.node(v));
        if !from.is_scheduled() || !to.is_scheduled() {
            continue;
        }
        let from_finish = from.finish(from.step);
        if from_finish >= to.step {
            violations.push(FeasibilityViolation::Precedence {
                from: u,
                to: v,
                from_name: from.name.clone(),
                to_name: to.name.clone(),
                from_finish,
                to_start: to.step,
            });
        }
    }

    violations
}

/// Whether every operation is scheduled and every precedence constraint holds.
///
/// Use [`find_violations`] to learn what went wrong.
pub fn is_feasible(graph: &DependencyGraph) -> bool {
    find_violations(graph).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::chain_graph;

    #[test]
    fn test_valid_chain_is_feasible() {
        let mut graph = chain_graph();
        graph.node_mut(0).step = 1;
        graph.node_mut(1).step = 2;
        graph.node_mut(2).step = 4;
        assert!(find_violations(&graph).is_empty());
        assert!(is_feasible(&graph));
    }

    #[test]
    fn test_overlap_with_multicycle_predecessor() {
        let mut graph = chain_graph();
        graph.node_mut(0).step = 1;
        graph.node_mut(1).step = 2; // mul occupies 2..=3
        graph.node_mut(2).step = 3;

        let violations = find_violations(&graph);
        assert_eq!(
            violations,
            vec![FeasibilityViolation::Precedence {
                from: 1,
                to: 2,
                from_name: "b".to_string(),
                to_name: "c".to_string(),
                from_finish: 3,
                to_start: 3,
            }]
        );
        assert!(!is_feasible(&graph));
    }

    #[test]
    fn test_unscheduled_reported() {
        let mut graph = chain_graph();
        graph.node_mut(0).step = 1;
        let violations = find_violations(&graph);
        assert_eq!(violations.len(), 2);
        assert!(violations
            .iter()
            .all(|v| matches!(v, FeasibilityViolation::Unscheduled { .. })));
        assert!(violations[0].to_string().contains("no committed step"));
        assert!(!is_feasible(&graph));
    }
}
