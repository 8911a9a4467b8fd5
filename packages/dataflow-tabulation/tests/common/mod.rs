//! Shared fixtures: a hand-buildable supergraph and table-driven flow
//! functions.
//!
//! The crate solves problems over an abstract supergraph; these helpers give
//! the integration tests a concrete one small enough to reason about by
//! hand. Flow functions default to identity and can be overridden per edge;
//! normal-flow evaluations are counted so tests can assert that summaries
//! were reused instead of re-running callee bodies.

use std::cell::RefCell;
use std::rc::Rc;

use dataflow_tabulation::solver::flow::{
    BinaryReturnFlowFunction, FlowFunctionMap, ReturnFlowFunction, UnaryFlowFunction,
};
use dataflow_tabulation::solver::problem::{
    MergeFunction, TabulationProblem, UnorderedDomain,
};
use dataflow_tabulation::solver::supergraph::{NodeId, ProcId, Supergraph};
use dataflow_tabulation::{FactId, PathEdge, SparseIntSet};
use rustc_hash::FxHashMap;

/// Node kinds the builder can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Entry,
    Exit,
    Call,
    ReturnSite,
    Normal,
}

#[derive(Debug)]
struct Block {
    proc: ProcId,
    local: u32,
    kind: BlockKind,
}

#[derive(Debug, Default)]
struct Procedure {
    entries: Vec<NodeId>,
    exits: Vec<NodeId>,
    blocks: Vec<NodeId>,
}

/// Per call block: who it calls and where it returns to.
#[derive(Debug, Default)]
struct CallSite {
    callees: Vec<NodeId>,
    return_sites: Vec<NodeId>,
    normal_successors: Vec<NodeId>,
}

/// A concrete supergraph for tests, built block by block.
#[derive(Debug, Default)]
pub struct TestGraph {
    blocks: Vec<Block>,
    procs: Vec<Procedure>,
    succs: Vec<Vec<NodeId>>,
    preds: Vec<Vec<NodeId>>,
    call_sites: FxHashMap<NodeId, CallSite>,
}

impl TestGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_procedure(&mut self) -> ProcId {
        let id = ProcId::new(self.procs.len() as u32);
        self.procs.push(Procedure::default());
        id
    }

    pub fn add_block(&mut self, proc: ProcId, kind: BlockKind) -> NodeId {
        let id = NodeId::new(self.blocks.len() as u32);
        let proc_data = &mut self.procs[proc.index() as usize];
        let local = proc_data.blocks.len() as u32;
        proc_data.blocks.push(id);
        match kind {
            BlockKind::Entry => proc_data.entries.push(id),
            BlockKind::Exit => proc_data.exits.push(id),
            BlockKind::Call => {
                self.call_sites.insert(id, CallSite::default());
            }
            _ => {}
        }
        self.blocks.push(Block { proc, local, kind });
        self.succs.push(Vec::new());
        self.preds.push(Vec::new());
        id
    }

    /// Adds a supergraph edge `from → to`.
    pub fn edge(&mut self, from: NodeId, to: NodeId) {
        self.succs[from.as_usize()].push(to);
        self.preds[to.as_usize()].push(from);
    }

    /// Wires `call` to a callee entry: records the callee and adds the
    /// call → entry supergraph edge.
    pub fn call_edge(&mut self, call: NodeId, callee_entry: NodeId) {
        self.edge(call, callee_entry);
        self.call_sites
            .get_mut(&call)
            .expect("call_edge on a non-call block")
            .callees
            .push(callee_entry);
    }

    /// Registers `return_site` for `call` and adds the call → return-site
    /// supergraph edge.
    pub fn return_site(&mut self, call: NodeId, return_site: NodeId) {
        self.edge(call, return_site);
        self.call_sites
            .get_mut(&call)
            .expect("return_site on a non-call block")
            .return_sites
            .push(return_site);
    }

    /// Adds the exit → return-site supergraph edge.
    pub fn return_edge(&mut self, callee_exit: NodeId, return_site: NodeId) {
        self.edge(callee_exit, return_site);
    }

    /// Registers a plain intraprocedural successor of a call block.
    pub fn normal_successor(&mut self, call: NodeId, succ: NodeId) {
        self.edge(call, succ);
        self.call_sites
            .get_mut(&call)
            .expect("normal_successor on a non-call block")
            .normal_successors
            .push(succ);
    }
}

impl Supergraph for TestGraph {
    fn is_call(&self, node: NodeId) -> bool {
        self.blocks[node.as_usize()].kind == BlockKind::Call
    }

    fn is_exit(&self, node: NodeId) -> bool {
        self.blocks[node.as_usize()].kind == BlockKind::Exit
    }

    fn succ_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.succs[node.as_usize()].clone()
    }

    fn pred_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.preds[node.as_usize()].clone()
    }

    fn called_nodes(&self, call: NodeId) -> Vec<NodeId> {
        self.call_sites
            .get(&call)
            .map(|cs| cs.callees.clone())
            .unwrap_or_default()
    }

    fn normal_successors(&self, call: NodeId) -> Vec<NodeId> {
        self.call_sites
            .get(&call)
            .map(|cs| cs.normal_successors.clone())
            .unwrap_or_default()
    }

    fn return_sites(&self, call: NodeId) -> Vec<NodeId> {
        self.call_sites
            .get(&call)
            .map(|cs| cs.return_sites.clone())
            .unwrap_or_default()
    }

    fn entries_for_procedure(&self, proc: ProcId) -> Vec<NodeId> {
        self.procs[proc.index() as usize].entries.clone()
    }

    fn exits_for_procedure(&self, proc: ProcId) -> Vec<NodeId> {
        self.procs[proc.index() as usize].exits.clone()
    }

    fn node_ids(&self) -> Vec<NodeId> {
        (0..self.blocks.len() as u32).map(NodeId::new).collect()
    }

    fn contains_node(&self, node: NodeId) -> bool {
        node.as_usize() < self.blocks.len()
    }

    fn local_block_number(&self, node: NodeId) -> u32 {
        self.blocks[node.as_usize()].local
    }

    fn local_block(&self, proc: ProcId, local_number: u32) -> Option<NodeId> {
        self.procs[proc.index() as usize]
            .blocks
            .get(local_number as usize)
            .copied()
    }

    fn proc_of(&self, node: NodeId) -> ProcId {
        self.blocks[node.as_usize()].proc
    }
}

type UnaryFn = Rc<dyn Fn(FactId) -> Vec<FactId>>;
type BinaryFn = Rc<dyn Fn(FactId, FactId) -> Vec<FactId>>;

/// Counts evaluations of normal flow functions, keyed by
/// `(source block, input fact)`.
pub type FlowCounter = Rc<RefCell<FxHashMap<(NodeId, FactId), usize>>>;

struct CountingUnary {
    f: UnaryFn,
    counter: Option<(NodeId, FlowCounter)>,
}

impl UnaryFlowFunction for CountingUnary {
    fn targets(&self, fact: FactId) -> SparseIntSet {
        if let Some((src, counter)) = &self.counter {
            *counter.borrow_mut().entry((*src, fact)).or_insert(0) += 1;
        }
        (self.f)(fact).into_iter().collect()
    }
}

struct BinaryAdapter {
    f: BinaryFn,
}

impl BinaryReturnFlowFunction for BinaryAdapter {
    fn targets(&self, call_fact: FactId, exit_fact: FactId) -> SparseIntSet {
        (self.f)(call_fact, exit_fact).into_iter().collect()
    }
}

/// Flow-function map with identity defaults and per-edge overrides.
pub struct TableFlowFunctions {
    normal: FxHashMap<(NodeId, NodeId), UnaryFn>,
    call: FxHashMap<(NodeId, NodeId), UnaryFn>,
    ret_unary: FxHashMap<(NodeId, NodeId, NodeId), UnaryFn>,
    ret_binary: FxHashMap<(NodeId, NodeId, NodeId), BinaryFn>,
    call_to_return: FxHashMap<(NodeId, NodeId), UnaryFn>,
    call_none_to_return: FxHashMap<(NodeId, NodeId), UnaryFn>,
    pub normal_evaluations: FlowCounter,
}

impl Default for TableFlowFunctions {
    fn default() -> Self {
        Self::new()
    }
}

impl TableFlowFunctions {
    pub fn new() -> Self {
        Self {
            normal: FxHashMap::default(),
            call: FxHashMap::default(),
            ret_unary: FxHashMap::default(),
            ret_binary: FxHashMap::default(),
            call_to_return: FxHashMap::default(),
            call_none_to_return: FxHashMap::default(),
            normal_evaluations: Rc::new(RefCell::new(FxHashMap::default())),
        }
    }

    pub fn set_normal(&mut self, src: NodeId, dst: NodeId, f: impl Fn(FactId) -> Vec<FactId> + 'static) {
        self.normal.insert((src, dst), Rc::new(f));
    }

    pub fn set_call(&mut self, call: NodeId, callee: NodeId, f: impl Fn(FactId) -> Vec<FactId> + 'static) {
        self.call.insert((call, callee), Rc::new(f));
    }

    pub fn set_return_unary(
        &mut self,
        call: NodeId,
        exit: NodeId,
        return_site: NodeId,
        f: impl Fn(FactId) -> Vec<FactId> + 'static,
    ) {
        self.ret_unary.insert((call, exit, return_site), Rc::new(f));
    }

    pub fn set_return_binary(
        &mut self,
        call: NodeId,
        exit: NodeId,
        return_site: NodeId,
        f: impl Fn(FactId, FactId) -> Vec<FactId> + 'static,
    ) {
        self.ret_binary.insert((call, exit, return_site), Rc::new(f));
    }

    pub fn set_call_to_return(
        &mut self,
        call: NodeId,
        return_site: NodeId,
        f: impl Fn(FactId) -> Vec<FactId> + 'static,
    ) {
        self.call_to_return.insert((call, return_site), Rc::new(f));
    }

    pub fn set_call_none_to_return(
        &mut self,
        call: NodeId,
        return_site: NodeId,
        f: impl Fn(FactId) -> Vec<FactId> + 'static,
    ) {
        self.call_none_to_return
            .insert((call, return_site), Rc::new(f));
    }

    /// Evaluation count of the normal flow out of `src` on `fact`.
    pub fn normal_evaluation_count(&self, src: NodeId, fact: FactId) -> usize {
        self.normal_evaluations
            .borrow()
            .get(&(src, fact))
            .copied()
            .unwrap_or(0)
    }

    fn identity() -> UnaryFn {
        Rc::new(|fact| vec![fact])
    }

    fn unary(&self, table: &FxHashMap<(NodeId, NodeId), UnaryFn>, key: (NodeId, NodeId)) -> Box<dyn UnaryFlowFunction> {
        let f = table.get(&key).cloned().unwrap_or_else(Self::identity);
        Box::new(CountingUnary { f, counter: None })
    }
}

impl FlowFunctionMap for TableFlowFunctions {
    fn normal_flow(&self, src: NodeId, dst: NodeId) -> Box<dyn UnaryFlowFunction> {
        let f = self
            .normal
            .get(&(src, dst))
            .cloned()
            .unwrap_or_else(Self::identity);
        Box::new(CountingUnary {
            f,
            counter: Some((src, Rc::clone(&self.normal_evaluations))),
        })
    }

    fn call_flow(&self, call: NodeId, callee_entry: NodeId) -> Box<dyn UnaryFlowFunction> {
        self.unary(&self.call, (call, callee_entry))
    }

    fn return_flow(&self, call: NodeId, exit: NodeId, return_site: NodeId) -> ReturnFlowFunction {
        if let Some(f) = self.ret_binary.get(&(call, exit, return_site)) {
            return ReturnFlowFunction::Binary(Box::new(BinaryAdapter { f: Rc::clone(f) }));
        }
        let f = self
            .ret_unary
            .get(&(call, exit, return_site))
            .cloned()
            .unwrap_or_else(Self::identity);
        ReturnFlowFunction::Unary(Box::new(CountingUnary { f, counter: None }))
    }

    fn call_to_return_flow(&self, call: NodeId, return_site: NodeId) -> Box<dyn UnaryFlowFunction> {
        self.unary(&self.call_to_return, (call, return_site))
    }

    fn call_none_to_return_flow(
        &self,
        call: NodeId,
        return_site: NodeId,
    ) -> Box<dyn UnaryFlowFunction> {
        self.unary(&self.call_none_to_return, (call, return_site))
    }
}

/// A complete problem over the test fixtures.
pub struct TestProblem {
    pub graph: TestGraph,
    pub flows: TableFlowFunctions,
    pub domain: UnorderedDomain,
    pub seeds: Vec<PathEdge>,
    pub merge: Option<Box<dyn MergeFunction>>,
}

impl TestProblem {
    pub fn new(graph: TestGraph, flows: TableFlowFunctions, domain_size: usize) -> Self {
        Self {
            graph,
            flows,
            domain: UnorderedDomain::new(domain_size),
            seeds: Vec::new(),
            merge: None,
        }
    }

    pub fn seed(mut self, seed: PathEdge) -> Self {
        self.seeds.push(seed);
        self
    }

    pub fn merge(mut self, merge: impl MergeFunction + 'static) -> Self {
        self.merge = Some(Box::new(merge));
        self
    }
}

impl TabulationProblem for TestProblem {
    type Graph = TestGraph;
    type Functions = TableFlowFunctions;
    type Domain = UnorderedDomain;

    fn supergraph(&self) -> &TestGraph {
        &self.graph
    }

    fn function_map(&self) -> &TableFlowFunctions {
        &self.flows
    }

    fn domain(&self) -> &UnorderedDomain {
        &self.domain
    }

    fn merge_function(&self) -> Option<&dyn MergeFunction> {
        self.merge.as_deref()
    }

    fn initial_seeds(&self) -> Vec<PathEdge> {
        self.seeds.clone()
    }
}
