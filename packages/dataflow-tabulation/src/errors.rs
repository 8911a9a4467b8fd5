//! Error types.
//!
//! The solver recovers nothing internally: programming errors panic,
//! collaborator panics propagate unchanged, and the one recoverable
//! condition (cooperative cancellation) carries the partially tabulated
//! result out to the caller.

use crate::solver::problem::TabulationProblem;
use crate::solver::result::TabulationResult;
use std::fmt;
use thiserror::Error;

/// Simple error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// Inverted summary lookups are not recorded and cannot be answered.
    #[error("summary source queries are not supported")]
    SummarySourcesUnsupported,

    /// A configuration value is out of range.
    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),
}

/// A solve was canceled by its progress monitor.
///
/// The partial result reflects every propagation performed before the
/// cancellation poll fired; all memo-table invariants hold on it. Call
/// [`TabulationResult::resume`] on the payload to continue the solve.
pub struct CancelledTabulation<P: TabulationProblem> {
    pub partial: TabulationResult<P>,
}

impl<P: TabulationProblem> fmt::Display for CancelledTabulation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.partial.statistics();
        write!(
            f,
            "tabulation canceled after {} iterations ({} path edges, {} summary edges recorded)",
            stats.iterations, stats.path_edges, stats.summary_edges
        )
    }
}

// The payload is generic over the problem, which need not be `Debug`; debug
// output shows the statistics instead.
impl<P: TabulationProblem> fmt::Debug for CancelledTabulation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelledTabulation")
            .field("statistics", self.partial.statistics())
            .finish_non_exhaustive()
    }
}

impl<P: TabulationProblem> std::error::Error for CancelledTabulation<P> {}
