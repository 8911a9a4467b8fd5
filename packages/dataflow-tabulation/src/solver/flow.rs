//! Flow functions and their per-edge dispatcher.
//!
//! A flow function describes the effect of one supergraph edge on the fact
//! domain: it maps a single input fact to the set of facts holding after the
//! edge. Return edges may additionally consult the fact that held at the
//! call site, which is what [`BinaryReturnFlowFunction`] is for.
//!
//! The empty set is the canonical "nothing flows" result; there is no null
//! in this protocol.

use super::supergraph::NodeId;
use crate::shared::SparseIntSet;
use crate::FactId;

/// A unary distributive flow function: one input fact to a set of output
/// facts.
pub trait UnaryFlowFunction {
    /// Facts holding after the edge, given that `fact` held before it.
    fn targets(&self, fact: FactId) -> SparseIntSet;
}

/// A return flow function that reads both the caller-side fact at the call
/// block and the callee-side fact at the exit block.
pub trait BinaryReturnFlowFunction {
    /// Facts holding at the return site, given `call_fact` at the call block
    /// and `exit_fact` at the callee exit.
    fn targets(&self, call_fact: FactId, exit_fact: FactId) -> SparseIntSet;
}

/// Flow function attached to an exit → return-site edge.
pub enum ReturnFlowFunction {
    Unary(Box<dyn UnaryFlowFunction>),
    Binary(Box<dyn BinaryReturnFlowFunction>),
}

/// Per-edge flow-function dispatcher, supplied by the problem.
pub trait FlowFunctionMap {
    /// Flow along an intraprocedural edge `src → dst`.
    fn normal_flow(&self, src: NodeId, dst: NodeId) -> Box<dyn UnaryFlowFunction>;

    /// Flow along a call edge `call → callee_entry`.
    fn call_flow(&self, call: NodeId, callee_entry: NodeId) -> Box<dyn UnaryFlowFunction>;

    /// Flow along an exit → return-site edge for the call at `call`.
    fn return_flow(&self, call: NodeId, exit: NodeId, return_site: NodeId) -> ReturnFlowFunction;

    /// Flow along the call → return-site bypass when the call has at least
    /// one callee.
    fn call_to_return_flow(&self, call: NodeId, return_site: NodeId) -> Box<dyn UnaryFlowFunction>;

    /// Flow along the call → return-site bypass when the call has no callee
    /// (e.g. a call the host could not resolve).
    fn call_none_to_return_flow(
        &self,
        call: NodeId,
        return_site: NodeId,
    ) -> Box<dyn UnaryFlowFunction>;
}

/// f(d) = {d}
pub struct IdentityFlowFunction;

impl UnaryFlowFunction for IdentityFlowFunction {
    fn targets(&self, fact: FactId) -> SparseIntSet {
        SparseIntSet::singleton(fact)
    }
}

/// f(d) = {}
pub struct KillFlowFunction;

impl UnaryFlowFunction for KillFlowFunction {
    fn targets(&self, _fact: FactId) -> SparseIntSet {
        SparseIntSet::new()
    }
}

/// f(d) = {d} ∪ {gen_fact}
pub struct GenFlowFunction {
    pub gen_fact: FactId,
}

impl GenFlowFunction {
    pub fn new(gen_fact: FactId) -> Self {
        Self { gen_fact }
    }
}

impl UnaryFlowFunction for GenFlowFunction {
    fn targets(&self, fact: FactId) -> SparseIntSet {
        let mut result = SparseIntSet::singleton(fact);
        result.insert(self.gen_fact);
        result
    }
}
