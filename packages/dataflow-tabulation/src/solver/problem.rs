//! Problem description consumed by the solver.

use super::flow::FlowFunctionMap;
use super::path_edge::PathEdge;
use super::supergraph::Supergraph;
use crate::shared::SparseIntSet;
use crate::FactId;

/// The fact domain of a tabulation problem.
///
/// Facts are dense non-negative ids; id 0 is conventionally the zero fact.
/// The domain also decides the worklist's exploration order. Priority is a
/// strict "should run first" relation; returning `false` both ways means the
/// two edges are tie-broken arbitrarily. Order influences how much work the
/// solver does, never what it computes.
pub trait TabulationDomain {
    /// Number of facts in the domain.
    fn size(&self) -> usize;

    /// True if `lhs` should be processed before `rhs`.
    fn has_priority_over(&self, _lhs: &PathEdge, _rhs: &PathEdge) -> bool {
        false
    }
}

/// Optional operator collapsing the facts reached at one `(entry, block)`
/// pair into a single representative. Enables widening and non-distributive
/// problems at the cost of full tabulation precision.
pub trait MergeFunction {
    /// Combines the already-recorded facts with the incoming `new_fact`.
    /// Returns the fact to propagate instead, or `None` to propagate
    /// nothing.
    fn merge(&self, pre_existing: &SparseIntSet, new_fact: FactId) -> Option<FactId>;
}

/// A distributive dataflow problem over an exploded supergraph.
pub trait TabulationProblem {
    type Graph: Supergraph;
    type Functions: FlowFunctionMap;
    type Domain: TabulationDomain;

    /// The supergraph that induces this problem.
    fn supergraph(&self) -> &Self::Graph;

    /// Per-edge flow functions.
    fn function_map(&self) -> &Self::Functions;

    /// The fact domain.
    fn domain(&self) -> &Self::Domain;

    /// Merge operator, or `None` for a plain distributive problem.
    fn merge_function(&self) -> Option<&dyn MergeFunction> {
        None
    }

    /// Path edges the tabulation starts from.
    fn initial_seeds(&self) -> Vec<PathEdge>;
}

/// A domain with a fixed size, no priority preference, and no merging.
/// Useful for tests and for problems that are happy with arbitrary
/// exploration order.
#[derive(Debug, Clone, Copy)]
pub struct UnorderedDomain {
    size: usize,
}

impl UnorderedDomain {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl TabulationDomain for UnorderedDomain {
    fn size(&self) -> usize {
        self.size
    }
}
