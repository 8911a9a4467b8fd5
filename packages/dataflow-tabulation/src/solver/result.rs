//! Read-only view over a finished (or canceled) solve.

use rustc_hash::FxHashSet;
use std::fmt;

use super::path_edge::PathEdge;
use super::problem::TabulationProblem;
use super::supergraph::{NodeId, Supergraph};
use super::tabulation::{SolverStatistics, TabulationSolver};
use crate::errors::SolverError;
use crate::shared::SparseIntSet;
use crate::FactId;

/// The memo state of a solve, owned.
///
/// Produced by [`TabulationSolver::solve`], either directly or inside
/// [`CancelledTabulation`](crate::errors::CancelledTabulation) when the
/// solve was canceled. Queries never mutate; [`TabulationResult::resume`]
/// turns the result back into a solver so new seeds can reuse everything
/// proven so far.
pub struct TabulationResult<P: TabulationProblem> {
    solver: TabulationSolver<P>,
}

impl<P: TabulationProblem> TabulationResult<P> {
    pub(crate) fn new(solver: TabulationSolver<P>) -> Self {
        Self { solver }
    }

    /// The facts holding at `node`, from any entry of its procedure.
    pub fn result_at(&self, node: NodeId) -> SparseIntSet {
        let graph = self.solver.problem.supergraph();
        let proc = graph.proc_of(node);
        let n = graph.local_block_number(node);

        let mut facts = SparseIntSet::new();
        for entry in graph.entries_for_procedure(proc) {
            if let Some(local) = self.solver.path_edges.get(&entry) {
                facts.union_with(&local.reachable_at(n));
            }
        }
        facts
    }

    /// The `d2` facts with a recorded summary `(n1, d1) → (n2, d2)`.
    /// `n1` and `n2` must belong to the same procedure.
    pub fn summary_targets(&self, n1: NodeId, d1: FactId, n2: NodeId) -> Option<&SparseIntSet> {
        let graph = self.solver.problem.supergraph();
        let summaries = self.solver.summary_edges.get(&graph.proc_of(n1))?;
        let num1 = graph.local_block_number(n1);
        let num2 = graph.local_block_number(n2);
        summaries.summary_edges(num1, num2, d1)
    }

    /// Inverted summary lookup. Summaries are only indexed forward, so this
    /// always fails with [`SolverError::SummarySourcesUnsupported`].
    pub fn summary_sources(
        &self,
        _n2: NodeId,
        _d2: FactId,
        _n1: NodeId,
    ) -> Result<SparseIntSet, SolverError> {
        Err(SolverError::SummarySourcesUnsupported)
    }

    /// Every supergraph node some fact reached, in ascending node order.
    pub fn supergraph_nodes_reached(&self) -> Vec<NodeId> {
        let graph = self.solver.problem.supergraph();
        let mut seen: FxHashSet<NodeId> = FxHashSet::default();
        for (entry, local) in &self.solver.path_edges {
            let proc = graph.proc_of(*entry);
            for n in local.reached_node_numbers().iter() {
                if let Some(node) = graph.local_block(proc, n) {
                    seen.insert(node);
                }
            }
        }
        let mut nodes: Vec<NodeId> = seen.into_iter().collect();
        nodes.sort_unstable();
        nodes
    }

    /// The seeds the tabulation ran from, in insertion order.
    pub fn seeds(&self) -> &[PathEdge] {
        self.solver.seeds()
    }

    pub fn statistics(&self) -> &SolverStatistics {
        &self.solver.stats
    }

    pub fn problem(&self) -> &P {
        self.solver.problem()
    }

    pub fn supergraph(&self) -> &P::Graph {
        self.solver.supergraph()
    }

    /// Turns the result back into a solver over the same memo tables.
    /// Seeds added afterwards reuse every path, summary and call-flow edge
    /// already recorded.
    pub fn resume(self) -> TabulationSolver<P> {
        self.solver
    }
}

// The problem need not be `Debug`; show the statistics instead.
impl<P: TabulationProblem> fmt::Debug for TabulationResult<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabulationResult")
            .field("statistics", self.statistics())
            .finish_non_exhaustive()
    }
}

/// Debug dump: every node in numeric order with the facts that hold there.
impl<P: TabulationProblem> fmt::Display for TabulationResult<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.solver.problem.supergraph();
        let mut nodes = graph.node_ids();
        nodes.sort_unstable();
        for node in nodes {
            writeln!(f, "{} : {:?}", node.index(), self.result_at(node))?;
        }
        Ok(())
    }
}
