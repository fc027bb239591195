//! Configuration types for graph construction and scheduling.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::classify::ResourceClass;

/// Default latency of multiply/divide-class operations, in control steps.
pub const DEFAULT_MUL_DELAY: u32 = 2;

/// Largest schedule horizon accepted, in control steps. Occupancy tables and
/// distribution graphs hold one row per step.
pub const MAX_HORIZON: u32 = 1 << 20;

/// Errors raised by invalid configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown scheduling algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Unknown ordering strategy: {0}")]
    UnknownOrdering(String),
    #[error("Unknown edge direction: {0}")]
    UnknownDirection(String),
    #[error("Latency factor must be a finite value >= 1.0, got {0}")]
    InvalidLatencyFactor(f64),
    #[error("Multiply delay must be at least 1")]
    InvalidMulDelay,
    #[error("Resource limit for {0} must be at least 1")]
    InvalidResourceLimit(String),
}

/// Scheduling heuristic to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Time-constrained entropy-directed scheduling.
    #[default]
    TcEds,
    /// Time-constrained entropy-directed scheduling, sinks first.
    TcEdsReverse,
    /// Resource-constrained entropy-directed scheduling.
    RcEds,
    /// Time-constrained force-directed scheduling.
    TcFds,
    /// Resource-constrained force-directed scheduling.
    RcFds,
}

impl Algorithm {
    /// Whether the schedule horizon is fixed (`⌊cdepth × LC⌋`).
    pub fn is_time_constrained(self) -> bool {
        matches!(self, Self::TcEds | Self::TcEdsReverse | Self::TcFds)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::TcEds => "tc-eds",
            Self::TcEdsReverse => "tc-eds-rev",
            Self::RcEds => "rc-eds",
            Self::TcFds => "tc-fds",
            Self::RcFds => "rc-fds",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tc-eds" | "eds" => Ok(Self::TcEds),
            "tc-eds-rev" | "eds-rev" => Ok(Self::TcEdsReverse),
            "rc-eds" => Ok(Self::RcEds),
            "tc-fds" | "fds" => Ok(Self::TcFds),
            "rc-fds" => Ok(Self::RcFds),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Topological ordering fed to the scheduling heuristics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OrderingStrategy {
    /// Post-order of the ASAP depth-first traversal.
    #[default]
    Dfs,
    /// Kahn's in-degree queue.
    Kahn,
}

impl OrderingStrategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Dfs => "dfs",
            Self::Kahn => "kahn",
        }
    }
}

impl fmt::Display for OrderingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OrderingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dfs" => Ok(Self::Dfs),
            "kahn" => Ok(Self::Kahn),
            _ => Err(ConfigError::UnknownOrdering(s.to_string())),
        }
    }
}

/// How edges of the input graph are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EdgeDirection {
    /// `from -> to` is stored literally.
    #[default]
    TopDown,
    /// `from -> to` is stored as `to -> from`, scheduling from the sinks.
    BottomUp,
}

impl EdgeDirection {
    pub fn name(self) -> &'static str {
        match self {
            Self::TopDown => "top-down",
            Self::BottomUp => "bottom-up",
        }
    }
}

impl fmt::Display for EdgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EdgeDirection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top-down" | "topdown" => Ok(Self::TopDown),
            "bottom-up" | "bottomup" => Ok(Self::BottomUp),
            _ => Err(ConfigError::UnknownDirection(s.to_string())),
        }
    }
}

/// Configuration consumed while building a dependency graph.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphConfig {
    /// Edge storage direction, fixed before any edge is added
    pub direction: EdgeDirection,
    /// Latency of multiply/divide-class operations
    pub mul_delay: u32,
    /// Latency relaxation factor LC; the horizon is `⌊cdepth × LC⌋`
    pub latency_factor: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            direction: EdgeDirection::TopDown,
            mul_delay: DEFAULT_MUL_DELAY,
            latency_factor: 1.0,
        }
    }
}

impl GraphConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.latency_factor.is_finite() || self.latency_factor < 1.0 {
            return Err(ConfigError::InvalidLatencyFactor(self.latency_factor));
        }
        if self.mul_delay == 0 {
            return Err(ConfigError::InvalidMulDelay);
        }
        Ok(())
    }
}

/// Configuration consumed by a scheduling run.
#[derive(Clone, Debug, PartialEq)]
pub struct SchedulingConfig {
    /// Heuristic to run
    pub algorithm: Algorithm,
    /// Topological ordering strategy
    pub ordering: OrderingStrategy,
    /// Wide (multiplier) units available per step, resource-constrained modes only
    pub max_wide_units: u32,
    /// Units available per step for every other class, resource-constrained modes only
    pub max_other_units: u32,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug
    pub verbosity: u8,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::TcEds,
            ordering: OrderingStrategy::Dfs,
            max_wide_units: 1,
            max_other_units: 1,
            verbosity: 0,
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_wide_units == 0 {
            return Err(ConfigError::InvalidResourceLimit(
                ResourceClass::Wide.to_string(),
            ));
        }
        if self.max_other_units == 0 {
            return Err(ConfigError::InvalidResourceLimit("other".to_string()));
        }
        Ok(())
    }

    /// Per-step unit limit for a resource class.
    pub fn limit_for(&self, class: &ResourceClass) -> u32 {
        if class.is_wide() {
            self.max_wide_units
        } else {
            self.max_other_units
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("tc-eds".parse::<Algorithm>(), Ok(Algorithm::TcEds));
        assert_eq!("RC-FDS".parse::<Algorithm>(), Ok(Algorithm::RcFds));
        assert_eq!("tc-eds-rev".parse::<Algorithm>(), Ok(Algorithm::TcEdsReverse));
        assert!(matches!(
            "list".parse::<Algorithm>(),
            Err(ConfigError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_algorithm_name_round_trips() {
        for algo in [
            Algorithm::TcEds,
            Algorithm::TcEdsReverse,
            Algorithm::RcEds,
            Algorithm::TcFds,
            Algorithm::RcFds,
        ] {
            assert_eq!(algo.to_string().parse::<Algorithm>(), Ok(algo));
        }
        assert!(Algorithm::TcFds.is_time_constrained());
        assert!(!Algorithm::RcEds.is_time_constrained());
    }

    #[test]
    fn test_parse_ordering_and_direction() {
        assert_eq!("kahn".parse::<OrderingStrategy>(), Ok(OrderingStrategy::Kahn));
        assert_eq!("bottom-up".parse::<EdgeDirection>(), Ok(EdgeDirection::BottomUp));
        assert!("sideways".parse::<EdgeDirection>().is_err());
        assert!("bfs".parse::<OrderingStrategy>().is_err());
    }

    #[test]
    fn test_graph_config_validation() {
        assert!(GraphConfig::default().validate().is_ok());

        let relaxed = GraphConfig {
            latency_factor: 0.5,
            ..GraphConfig::default()
        };
        assert_eq!(
            relaxed.validate(),
            Err(ConfigError::InvalidLatencyFactor(0.5))
        );

        let zero_delay = GraphConfig {
            mul_delay: 0,
            ..GraphConfig::default()
        };
        assert_eq!(zero_delay.validate(), Err(ConfigError::InvalidMulDelay));
    }

    #[test]
    fn test_scheduling_config_limits() {
        let config = SchedulingConfig {
            max_wide_units: 2,
            max_other_units: 3,
            ..SchedulingConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.limit_for(&ResourceClass::Wide), 2);
        assert_eq!(config.limit_for(&ResourceClass::Narrow), 3);
        assert_eq!(
            config.limit_for(&ResourceClass::Other("fma".to_string())),
            3
        );

        let broken = SchedulingConfig {
            max_other_units: 0,
            ..SchedulingConfig::default()
        };
        assert!(matches!(
            broken.validate(),
            Err(ConfigError::InvalidResourceLimit(_))
        ));
    }
}
