//! Integer-programming export of the scheduling problem in CPLEX LP format.
//!
//! Variable `x{n},{i}` is 1 when operation `n` starts at step `i`. Both models
//! are built from the current ASAP/ALAP windows.

use crate::config::SchedulingConfig;
use crate::graph::{DependencyGraph, GraphError};

/// Candidate start steps of every operation, indexed by node id.
type Windows = Vec<(u32, u32)>;

fn var(node: usize, step: u32) -> String {
    format!("x{},{}", node, step)
}

fn require_timing(graph: &DependencyGraph) -> Result<(), GraphError> {
    if graph.has_timing() {
        Ok(())
    } else {
        Err(GraphError::AsapNotComputed)
    }
}

/// One `x_n,i = 1` row per operation.
fn assignment_rows(windows: &Windows, lines: &mut Vec<String>) {
    for (n, &(lo, hi)) in windows.iter().enumerate() {
        let terms: Vec<String> = (lo..=hi).map(|i| var(n, i)).collect();
        lines.push(format!("{} = 1", terms.join(" + ")));
    }
}

/// Left-hand sides of the per-step resource rows, paired with the class id.
///
/// A row is emitted only when at least two operations of the class could
/// occupy the step.
fn resource_terms(graph: &DependencyGraph, windows: &Windows) -> Vec<(usize, String)> {
    let horizon = graph
        .nodes()
        .iter()
        .map(|n| windows[n.id].1 + n.delay - 1)
        .max()
        .unwrap_or(0);

    let mut rows = Vec::new();
    for step in 1..=horizon {
        for class in 0..graph.class_count() {
            let mut candidates = 0;
            let mut terms = Vec::new();
            for node in graph.nodes().iter().filter(|n| n.class == class) {
                let (lo, hi) = windows[node.id];
                let first = lo.max((step + 1).saturating_sub(node.delay));
                let last = hi.min(step);
                if first > last {
                    continue;
                }
                candidates += 1;
                terms.extend((first..=last).map(|i| var(node.id, i)));
            }
            if candidates >= 2 {
                rows.push((class, terms.join(" + ")));
            }
        }
    }
    rows
}

/// `sum(i * x_u,i) - sum(i * x_v,i) <= -delay(u)` for every edge.
fn precedence_rows(graph: &DependencyGraph, windows: &Windows, lines: &mut Vec<String>) {
    for (u, v) in graph.edges() {
        let weighted = |n: usize| -> Vec<String> {
            let (lo, hi) = windows[n];
            (lo..=hi).map(|i| format!("{} {}", i, var(n, i))).collect()
        };
        lines.push(format!(
            "{} - {} <= -{}",
            weighted(u).join(" + "),
            weighted(v).join(" - "),
            graph.node(u).delay
        ));
    }
}

fn binary_bounds(windows: &Windows, lines: &mut Vec<String>) {
    for (n, &(lo, hi)) in windows.iter().enumerate() {
        lines.extend((lo..=hi).map(|i| format!("0 <= {} <= 1", var(n, i))));
    }
}

fn generals(windows: &Windows, lines: &mut Vec<String>) {
    for (n, &(lo, hi)) in windows.iter().enumerate() {
        lines.extend((lo..=hi).map(|i| var(n, i)));
    }
}

fn finish(mut lines: Vec<String>) -> String {
    lines.push("End".to_string());
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Latency-constrained model: minimise the unit counts `M1` (wide class) and
/// `M2` (every other class) within the current windows.
pub fn time_constrained_lp(graph: &DependencyGraph) -> Result<String, GraphError> {
    require_timing(graph)?;
    let windows: Windows = graph.nodes().iter().map(|n| (n.asap, n.alap)).collect();

    let mut lines = vec![
        "Minimize".to_string(),
        "M1 + M2".to_string(),
        "Subject To".to_string(),
    ];
    assignment_rows(&windows, &mut lines);
    for (class, terms) in resource_terms(graph, &windows) {
        let bound = if graph.class(class).is_wide() { "M1" } else { "M2" };
        lines.push(format!("{} - {} <= 0", terms, bound));
    }
    precedence_rows(graph, &windows, &mut lines);

    lines.push("Bounds".to_string());
    binary_bounds(&windows, &mut lines);
    lines.push("M1 >= 1".to_string());
    lines.push("M2 >= 1".to_string());

    lines.push("Generals".to_string());
    generals(&windows, &mut lines);
    lines.push("M1".to_string());
    lines.push("M2".to_string());

    Ok(finish(lines))
}

/// Resource-constrained model: minimise the latency `L` under the configured
/// unit limits.
///
/// Windows are stretched to the serial horizon (the sum of all delays), the
/// longest any schedule with at least one unit per class can need.
pub fn resource_constrained_lp(
    graph: &DependencyGraph,
    config: &SchedulingConfig,
) -> Result<String, GraphError> {
    require_timing(graph)?;
    let serial = graph
        .nodes()
        .iter()
        .fold(0u32, |acc, n| acc.saturating_add(n.delay));
    let slack = serial.saturating_sub(graph.constrained_latency());
    let windows: Windows = graph
        .nodes()
        .iter()
        .map(|n| (n.asap, n.alap + slack))
        .collect();

    let mut lines = vec![
        "Minimize".to_string(),
        "L".to_string(),
        "Subject To".to_string(),
    ];
    assignment_rows(&windows, &mut lines);
    for node in graph.nodes() {
        let (lo, hi) = windows[node.id];
        lines.extend(
            (lo..=hi).map(|i| format!("{} {} - L <= 0", node.finish(i), var(node.id, i))),
        );
    }
    for (class, terms) in resource_terms(graph, &windows) {
        let limit = config.limit_for(graph.class(class));
        lines.push(format!("{} <= {}", terms, limit));
    }
    precedence_rows(graph, &windows, &mut lines);

    lines.push("Bounds".to_string());
    binary_bounds(&windows, &mut lines);
    lines.push("L >= 1".to_string());

    lines.push("Generals".to_string());
    generals(&windows, &mut lines);
    lines.push("L".to_string());

    Ok(finish(lines))
}
