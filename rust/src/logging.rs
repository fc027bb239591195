//! Logging macros for the scheduler with verbosity level control.
//!
//! Messages go to stderr and cost nothing beyond a comparison when disabled.
//! Verbosity levels:
//! - 0: SILENT (only errors)
//! - 1: CHANGES (commits, horizon extensions, violations)
//! - 2: CHECKS (candidate selection, deferred operations, final occupancy)
//! - 3: DEBUG (per-step costs and forces)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: committed steps, horizon extensions, feasibility failures.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            eprintln!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: chosen candidates, operations left waiting on a full class.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            eprintln!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: cost and force of every candidate step.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!($($arg)*);
        }
    };
}

/// One log line for the occupancy of a resource class, e.g.
/// `WIDE peak 2: 2 2 0 1 1`.
pub fn format_profile(class: &str, peak: u32, per_step: &[u32]) -> String {
    let steps: Vec<String> = per_step.iter().map(u32::to_string).collect();
    format!("{} peak {}: {}", class, peak, steps.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_profile() {
        assert_eq!(format_profile("WIDE", 2, &[2, 2, 0, 1]), "WIDE peak 2: 2 2 0 1");
        assert_eq!(format_profile("fma", 0, &[]), "fma peak 0: ");
    }

    #[test]
    fn test_levels_are_cumulative() {
        assert!(VERBOSITY_SILENT < VERBOSITY_CHANGES);
        assert!(VERBOSITY_CHANGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_log_macros_compile() {
        let verbosity = VERBOSITY_SILENT;
        log_changes!(verbosity, "commit {} at {}", "a", 1);
        log_checks!(verbosity, "candidate {}", 2);
        log_debug!(verbosity, "force {:.4}", 0.25);
        log_debug!(VERBOSITY_DEBUG, "force {:.4}", 0.5);
    }
}
