//! Solver tuning knobs.
//!
//! Nothing here changes what the solver computes; the knobs control how
//! chatty it is and how often it offers collaborators a chance to shed
//! cached state during very long solves.

use crate::errors::SolverError;
use serde::{Deserialize, Serialize};

/// Default worklist iterations between progress log lines.
pub const DEFAULT_PROGRESS_LOG_INTERVAL: usize = 1_000;

/// Default worklist iterations between cache-evictor invocations.
pub const DEFAULT_CACHE_WIPE_INTERVAL: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Emit a `debug`-level progress line every this many iterations
    /// (1..).
    #[serde(default = "default_progress_log_interval")]
    pub progress_log_interval: usize,

    /// Invoke the installed cache evictor every this many iterations (1..).
    /// Ignored when no evictor is installed.
    #[serde(default = "default_cache_wipe_interval")]
    pub cache_wipe_interval: usize,
}

fn default_progress_log_interval() -> usize {
    DEFAULT_PROGRESS_LOG_INTERVAL
}

fn default_cache_wipe_interval() -> usize {
    DEFAULT_CACHE_WIPE_INTERVAL
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            progress_log_interval: DEFAULT_PROGRESS_LOG_INTERVAL,
            cache_wipe_interval: DEFAULT_CACHE_WIPE_INTERVAL,
        }
    }
}

impl SolverConfig {
    /// Range-checks the configuration.
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.progress_log_interval == 0 {
            return Err(SolverError::InvalidConfig(
                "progress_log_interval must be at least 1".to_string(),
            ));
        }
        if self.cache_wipe_interval == 0 {
            return Err(SolverError::InvalidConfig(
                "cache_wipe_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
