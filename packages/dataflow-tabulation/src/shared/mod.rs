//! Shared data structures used across the solver.

pub mod intset;

pub use intset::SparseIntSet;
