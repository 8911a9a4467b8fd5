//! Precise interprocedural tabulation solver for distributive dataflow
//! problems over exploded supergraphs.
//!
//! This crate implements the worklist tabulation algorithm of Reps, Horwitz
//! and Sagiv (POPL 1995) as a reusable library: the host supplies an
//! abstract supergraph, per-edge flow functions and the initial seeds; the
//! solver saturates path edges, procedure summaries and call-flow edges to a
//! fixed point and hands back a queryable result.
//!
//! Compared to the textbook algorithm it supports multiple exit blocks per
//! procedure (exceptional control flow), an optional merge operator for
//! widening and non-distributive problems, and callee-indexed summary edges
//! so summaries proven at one call site are replayed for free at all others.
//!
//! # Example
//!
//! ```rust,ignore
//! use dataflow_tabulation::solver::TabulationSolver;
//!
//! let solver = TabulationSolver::new(problem);
//! let result = solver.solve()?;
//! let facts = result.result_at(node);
//! ```
//!
//! # References
//! - Reps, Horwitz, Sagiv (1995): "Precise Interprocedural Dataflow
//!   Analysis via Graph Reachability"
//! - Naeem, Lhoták, Rodriguez (2010): "Practical Extensions to the IFDS
//!   Algorithm"

pub mod config;
pub mod errors;
pub mod shared;
pub mod solver;

/// A dataflow fact id. Facts are dense non-negative integers, bounded by
/// the problem's domain size.
pub type FactId = u32;

/// Conventional id of the zero (bottom) fact.
pub const ZERO_FACT: FactId = 0;

pub use config::SolverConfig;
pub use errors::{CancelledTabulation, SolverError};
pub use shared::SparseIntSet;
pub use solver::{
    FlowFunctionMap, MergeFunction, NodeId, PathEdge, ProcId, ProgressMonitor, SolverStatistics,
    Supergraph, TabulationDomain, TabulationProblem, TabulationResult, TabulationSolver,
};
