//! Abstract supergraph interface.
//!
//! The solver never builds control-flow graphs itself; it consumes an
//! interprocedural CFG (supergraph) owned by the host through this trait.
//! Nodes and procedures are opaque integer handles into host-owned arenas,
//! which keeps memo-table keys compact and sidesteps any question of node
//! identity or ownership.

use crate::shared::SparseIntSet;

/// Handle to a basic block in the exploded supergraph.
///
/// The wrapped value doubles as the block's global number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The global block number.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcId(u32);

impl ProcId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// An interprocedural control-flow graph.
///
/// Each node belongs to exactly one procedure and carries two numberings: a
/// global number unique across the graph (the `NodeId` itself) and a local
/// number unique within its procedure. Procedures may have several entry
/// blocks and several exit blocks; the latter model exceptional returns,
/// where distinct exits reach distinct return sites.
pub trait Supergraph {
    /// True if `node` is a call block.
    fn is_call(&self, node: NodeId) -> bool;

    /// True if `node` is a procedure exit block.
    fn is_exit(&self, node: NodeId) -> bool;

    /// Successors of `node` in the supergraph. For an exit block these are
    /// the return sites in all callers; for a call block they include callee
    /// entries and return sites.
    fn succ_nodes(&self, node: NodeId) -> Vec<NodeId>;

    /// Predecessors of `node` in the supergraph. For an entry block these
    /// are the call blocks in all callers.
    fn pred_nodes(&self, node: NodeId) -> Vec<NodeId>;

    /// Callee entry blocks invoked from the call block `call`.
    fn called_nodes(&self, call: NodeId) -> Vec<NodeId>;

    /// Intraprocedural successors of a call block that are neither callee
    /// entries nor return sites. Backward problems fan out of call blocks
    /// this way.
    fn normal_successors(&self, call: NodeId) -> Vec<NodeId>;

    /// Return sites of the call block `call`.
    fn return_sites(&self, call: NodeId) -> Vec<NodeId>;

    /// Entry blocks of `proc`.
    fn entries_for_procedure(&self, proc: ProcId) -> Vec<NodeId>;

    /// Exit blocks of `proc`.
    fn exits_for_procedure(&self, proc: ProcId) -> Vec<NodeId>;

    /// All nodes in the supergraph.
    fn node_ids(&self) -> Vec<NodeId>;

    /// True if `node` belongs to this supergraph.
    fn contains_node(&self, node: NodeId) -> bool;

    /// Global number of `node`.
    #[inline]
    fn number(&self, node: NodeId) -> u32 {
        node.index()
    }

    /// Number of `node` within its procedure.
    fn local_block_number(&self, node: NodeId) -> u32;

    /// Reverse of [`Supergraph::local_block_number`].
    fn local_block(&self, proc: ProcId, local_number: u32) -> Option<NodeId>;

    /// Global numbers of the successors of `node`, as a set.
    fn succ_node_numbers(&self, node: NodeId) -> SparseIntSet {
        self.succ_nodes(node)
            .into_iter()
            .map(|n| self.number(n))
            .collect()
    }

    /// The procedure that owns `node`.
    fn proc_of(&self, node: NodeId) -> ProcId;
}
