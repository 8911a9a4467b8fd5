//! Per-entry memo of reached path edges.
//!
//! One `LocalPathEdges` exists per procedure entry block `s_p` and records
//! every path edge `(s_p, d1) → (n, d2)` seen so far, with `n` stored as the
//! local block number. Besides the forward map `(n, d1) → {d2}` it keeps an
//! inverse index `(n, d2) → {d1}`, which exit propagation consults to
//! reconstruct caller-side entry facts.

use crate::shared::SparseIntSet;
use crate::FactId;
use rustc_hash::FxHashMap;

/// Path edges reached from one procedure entry.
#[derive(Debug, Default)]
pub struct LocalPathEdges {
    /// `(local block, d1) → {d2}`.
    forward: FxHashMap<(u32, FactId), SparseIntSet>,

    /// `(local block, d2) → {d1}`. Kept consistent with `forward`.
    inverse: FxHashMap<(u32, FactId), SparseIntSet>,

    /// Whether the owning solver runs with a merge operator. Merge-mode
    /// solvers read the forward map through [`LocalPathEdges::reachable`];
    /// plain solvers never do.
    merge_mode: bool,
}

impl LocalPathEdges {
    pub fn new(merge_mode: bool) -> Self {
        Self {
            forward: FxHashMap::default(),
            inverse: FxHashMap::default(),
            merge_mode,
        }
    }

    /// True if `(d1) → (n, d2)` is already recorded.
    pub fn contains(&self, d1: FactId, n: u32, d2: FactId) -> bool {
        self.forward
            .get(&(n, d1))
            .map_or(false, |facts| facts.contains(d2))
    }

    /// Records `(d1) → (n, d2)` in both directions.
    pub fn add_path_edge(&mut self, d1: FactId, n: u32, d2: FactId) {
        self.forward.entry((n, d1)).or_default().insert(d2);
        self.inverse.entry((n, d2)).or_default().insert(d1);
    }

    /// The set of `d1` with a recorded edge `(d1) → (n, d2)`.
    pub fn inverse(&self, n: u32, d2: FactId) -> Option<&SparseIntSet> {
        self.inverse.get(&(n, d2))
    }

    /// The set of `d2` reached at `n` from the specific entry fact `d1`.
    /// Only meaningful when a merge operator is installed.
    pub fn reachable(&self, n: u32, d1: FactId) -> Option<&SparseIntSet> {
        debug_assert!(self.merge_mode, "reachable(n, d1) requires merge mode");
        self.forward.get(&(n, d1))
    }

    /// The set of `d2` reached at `n` from any entry fact.
    pub fn reachable_at(&self, n: u32) -> SparseIntSet {
        let mut result = SparseIntSet::new();
        for ((block, _), facts) in &self.forward {
            if *block == n {
                result.union_with(facts);
            }
        }
        result
    }

    /// Removes every fact recorded at `(n, d1)`, keeping the inverse index
    /// consistent. Used by the solver's merge step when the merge operator
    /// supersedes previously recorded facts.
    pub fn collapse(&mut self, n: u32, d1: FactId) {
        debug_assert!(self.merge_mode, "collapse requires merge mode");
        let Some(facts) = self.forward.remove(&(n, d1)) else {
            return;
        };
        for d2 in facts.iter() {
            if let Some(sources) = self.inverse.get_mut(&(n, d2)) {
                sources.remove(d1);
                if sources.is_empty() {
                    self.inverse.remove(&(n, d2));
                }
            }
        }
    }

    /// Collapses `(n, d1)` down to the single fact `keep`.
    pub fn collapse_to(&mut self, n: u32, d1: FactId, keep: FactId) {
        self.collapse(n, d1);
        self.add_path_edge(d1, n, keep);
    }

    /// Local numbers of every block with at least one recorded edge.
    pub fn reached_node_numbers(&self) -> SparseIntSet {
        self.forward.keys().map(|&(n, _)| n).collect()
    }

    /// Verifies forward/inverse consistency. Test support.
    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let forward_ok = self.forward.iter().all(|(&(n, d1), d2s)| {
            d2s.iter().all(|d2| {
                self.inverse
                    .get(&(n, d2))
                    .map_or(false, |d1s| d1s.contains(d1))
            })
        });
        let inverse_ok = self.inverse.iter().all(|(&(n, d2), d1s)| {
            d1s.iter().all(|d1| {
                self.forward
                    .get(&(n, d1))
                    .map_or(false, |d2s| d2s.contains(d2))
            })
        });
        forward_ok && inverse_ok
    }
}
