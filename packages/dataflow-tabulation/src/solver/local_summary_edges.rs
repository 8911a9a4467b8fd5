//! Per-procedure memo of proven summaries.
//!
//! A summary edge `(s_p, x, d1) → {d2}` states that entering the procedure
//! at local block `s_p` with fact `d1` reaches its exit `x` with each fact in
//! `{d2}`. Summaries are indexed by the callee rather than by caller
//! call/return pairs, so a summary proven at one call site is replayed for
//! free at every other call site of the same procedure.

use crate::shared::SparseIntSet;
use crate::FactId;
use rustc_hash::FxHashMap;

/// Summary edges for one procedure.
#[derive(Debug, Default)]
pub struct LocalSummaryEdges {
    /// `(entry local, exit local, d1) → {d2}`.
    edges: FxHashMap<(u32, u32, FactId), SparseIntSet>,
}

impl LocalSummaryEdges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, s_p: u32, x: u32, d1: FactId, d2: FactId) -> bool {
        self.edges
            .get(&(s_p, x, d1))
            .map_or(false, |facts| facts.contains(d2))
    }

    pub fn insert_summary_edge(&mut self, s_p: u32, x: u32, d1: FactId, d2: FactId) {
        self.edges.entry((s_p, x, d1)).or_default().insert(d2);
    }

    /// The `d2` facts proven for `(s_p, x, d1)`, if any.
    pub fn summary_edges(&self, s_p: u32, x: u32, d1: FactId) -> Option<&SparseIntSet> {
        self.edges.get(&(s_p, x, d1))
    }

    /// Total number of recorded `(s_p, x, d1, d2)` tuples.
    pub fn len(&self) -> usize {
        self.edges.values().map(SparseIntSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
