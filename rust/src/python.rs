//! Python bindings, exposed as the `rust` extension module.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;
use std::fmt::Display;

use crate::config::{GraphConfig, SchedulingConfig};
use crate::graph::{build_graph, DependencyGraph};
use crate::models::{ScheduleResult, ScheduledOp};
use crate::parser::parse_dot;
use crate::scheduler::Scheduler;

fn value_error(err: impl Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Graph and scheduling options in one flat object.
#[pyclass(name = "ScheduleConfig")]
#[derive(Clone, Debug)]
pub struct PyScheduleConfig {
    /// "tc-eds", "tc-eds-rev", "rc-eds", "tc-fds" or "rc-fds"
    #[pyo3(get, set)]
    pub algorithm: String,
    /// "dfs" or "kahn"
    #[pyo3(get, set)]
    pub ordering: String,
    /// "top-down" or "bottom-up"
    #[pyo3(get, set)]
    pub direction: String,
    #[pyo3(get, set)]
    pub mul_delay: u32,
    #[pyo3(get, set)]
    pub latency_factor: f64,
    #[pyo3(get, set)]
    pub max_wide_units: u32,
    #[pyo3(get, set)]
    pub max_other_units: u32,
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for PyScheduleConfig {
    fn default() -> Self {
        let graph = GraphConfig::default();
        let scheduling = SchedulingConfig::default();
        Self {
            algorithm: scheduling.algorithm.to_string(),
            ordering: scheduling.ordering.to_string(),
            direction: graph.direction.to_string(),
            mul_delay: graph.mul_delay,
            latency_factor: graph.latency_factor,
            max_wide_units: scheduling.max_wide_units,
            max_other_units: scheduling.max_other_units,
            verbosity: scheduling.verbosity,
        }
    }
}

impl PyScheduleConfig {
    fn split(&self) -> PyResult<(GraphConfig, SchedulingConfig)> {
        let graph = GraphConfig {
            direction: self.direction.parse().map_err(value_error)?,
            mul_delay: self.mul_delay,
            latency_factor: self.latency_factor,
        };
        let scheduling = SchedulingConfig {
            algorithm: self.algorithm.parse().map_err(value_error)?,
            ordering: self.ordering.parse().map_err(value_error)?,
            max_wide_units: self.max_wide_units,
            max_other_units: self.max_other_units,
            verbosity: self.verbosity,
        };
        Ok((graph, scheduling))
    }
}

#[pymethods]
impl PyScheduleConfig {
    #[new]
    #[pyo3(signature = (
        algorithm=None,
        ordering=None,
        direction=None,
        mul_delay=None,
        latency_factor=None,
        max_wide_units=None,
        max_other_units=None,
        verbosity=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        algorithm: Option<String>,
        ordering: Option<String>,
        direction: Option<String>,
        mul_delay: Option<u32>,
        latency_factor: Option<f64>,
        max_wide_units: Option<u32>,
        max_other_units: Option<u32>,
        verbosity: Option<u8>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            algorithm: algorithm.unwrap_or(defaults.algorithm),
            ordering: ordering.unwrap_or(defaults.ordering),
            direction: direction.unwrap_or(defaults.direction),
            mul_delay: mul_delay.unwrap_or(defaults.mul_delay),
            latency_factor: latency_factor.unwrap_or(defaults.latency_factor),
            max_wide_units: max_wide_units.unwrap_or(defaults.max_wide_units),
            max_other_units: max_other_units.unwrap_or(defaults.max_other_units),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleConfig(algorithm={:?}, ordering={:?}, direction={:?}, latency_factor={}, wide={}, other={})",
            self.algorithm,
            self.ordering,
            self.direction,
            self.latency_factor,
            self.max_wide_units,
            self.max_other_units
        )
    }
}

/// One scheduled operation.
#[pyclass(name = "ScheduledOp")]
#[derive(Clone, Debug)]
pub struct PyScheduledOp {
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub kind: String,
    #[pyo3(get)]
    pub resource_class: String,
    #[pyo3(get)]
    pub delay: u32,
    #[pyo3(get)]
    pub asap: u32,
    #[pyo3(get)]
    pub alap: u32,
    #[pyo3(get)]
    pub step: u32,
}

impl From<ScheduledOp> for PyScheduledOp {
    fn from(op: ScheduledOp) -> Self {
        Self {
            name: op.name,
            kind: op.kind,
            resource_class: op.resource_class,
            delay: op.delay,
            asap: op.asap,
            alap: op.alap,
            step: op.step,
        }
    }
}

#[pymethods]
impl PyScheduledOp {
    fn __repr__(&self) -> String {
        format!(
            "ScheduledOp(name={:?}, kind={:?}, step={}, window=[{}, {}])",
            self.name, self.kind, self.step, self.asap, self.alap
        )
    }
}

/// Outcome of a scheduling run.
#[pyclass(name = "ScheduleResult")]
#[derive(Clone, Debug)]
pub struct PyScheduleResult {
    #[pyo3(get)]
    pub ops: Vec<PyScheduledOp>,
    #[pyo3(get)]
    pub order: Vec<String>,
    #[pyo3(get)]
    pub max_latency: u32,
    #[pyo3(get)]
    pub critical_path_length: u32,
    #[pyo3(get)]
    pub constrained_latency: Option<u32>,
    #[pyo3(get)]
    pub peak_occupancy: HashMap<String, u32>,
    /// Occupancy per step, keyed by resource class
    #[pyo3(get)]
    pub usage_profile: HashMap<String, Vec<u32>>,
    #[pyo3(get)]
    pub algorithm_metadata: HashMap<String, String>,
}

impl From<ScheduleResult> for PyScheduleResult {
    fn from(result: ScheduleResult) -> Self {
        let peak_occupancy = result
            .usage
            .iter()
            .map(|u| (u.resource_class.clone(), u.peak))
            .collect();
        let usage_profile = result
            .usage
            .into_iter()
            .map(|u| (u.resource_class, u.per_step))
            .collect();
        Self {
            ops: result.ops.into_iter().map(PyScheduledOp::from).collect(),
            order: result.order,
            max_latency: result.max_latency,
            critical_path_length: result.critical_path_length,
            constrained_latency: result.constrained_latency,
            peak_occupancy,
            usage_profile,
            algorithm_metadata: result.algorithm_metadata.into_iter().collect(),
        }
    }
}

#[pymethods]
impl PyScheduleResult {
    /// Committed step of an operation, or None if unknown.
    fn step_of(&self, name: &str) -> Option<u32> {
        self.ops.iter().find(|op| op.name == name).map(|op| op.step)
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleResult(ops={}, max_latency={}, critical_path_length={})",
            self.ops.len(),
            self.max_latency,
            self.critical_path_length
        )
    }
}

fn run(mut graph: DependencyGraph, config: SchedulingConfig) -> PyResult<PyScheduleResult> {
    let scheduler = Scheduler::new(config).map_err(value_error)?;
    let result = scheduler.schedule(&mut graph).map_err(value_error)?;
    Ok(result.into())
}

/// Schedule a graph given as `(name, kind)` vertices and `(from, to)` edges.
///
/// # Raises
/// * ValueError for unknown vertices, cycles, bad options or an infeasible run
#[pyfunction]
#[pyo3(name = "schedule_graph", signature = (vertices, edges, config=None))]
fn py_schedule_graph(
    vertices: Vec<(String, String)>,
    edges: Vec<(String, String)>,
    config: Option<PyScheduleConfig>,
) -> PyResult<PyScheduleResult> {
    let (graph_config, scheduling) = config.unwrap_or_default().split()?;
    let graph = build_graph(&vertices, &edges, graph_config).map_err(value_error)?;
    run(graph, scheduling)
}

/// Parse a DOT dataflow description and schedule it.
///
/// # Raises
/// * ValueError for parse errors and everything `schedule_graph` rejects
#[pyfunction]
#[pyo3(name = "schedule_dot", signature = (text, config=None))]
fn py_schedule_dot(text: &str, config: Option<PyScheduleConfig>) -> PyResult<PyScheduleResult> {
    let (graph_config, scheduling) = config.unwrap_or_default().split()?;
    let graph = parse_dot(text)
        .and_then(|dot| dot.build(graph_config))
        .map_err(value_error)?;
    run(graph, scheduling)
}

/// The eds.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyScheduleConfig>()?;
    m.add_class::<PyScheduledOp>()?;
    m.add_class::<PyScheduleResult>()?;

    m.add_function(wrap_pyfunction!(py_schedule_graph, m)?)?;
    m.add_function(wrap_pyfunction!(py_schedule_dot, m)?)?;

    Ok(())
}
