//! Interprocedural tabulation solver.
//!
//! Worklist-based implementation of the tabulation algorithm from Reps,
//! Horwitz and Sagiv, "Precise Interprocedural Dataflow Analysis via Graph
//! Reachability" (POPL 1995), with three extensions:
//!
//! - procedures may have several exit blocks, so exceptional and normal
//!   returns can reach different return sites;
//! - an optional merge operator collapses the facts reached at one
//!   `(entry, block)` pair, enabling widening and non-distributive problems;
//! - summary edges are stored at the callee rather than per call site, so a
//!   summary proven once is replayed at every other call site of the same
//!   procedure.
//!
//! The solve is a single-threaded tight loop. Cancellation is cooperative:
//! the progress monitor is polled once per worklist iteration, and a
//! canceled solve surfaces the partially tabulated result inside the error.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, trace};

use super::call_flow_edges::CallFlowEdges;
use super::flow::{FlowFunctionMap, ReturnFlowFunction};
use super::local_path_edges::LocalPathEdges;
use super::local_summary_edges::LocalSummaryEdges;
use super::path_edge::PathEdge;
use super::problem::TabulationProblem;
use super::progress::{NeverCanceled, ProgressMonitor};
use super::result::TabulationResult;
use super::supergraph::{NodeId, ProcId, Supergraph};
use super::worklist::Worklist;
use crate::config::SolverConfig;
use crate::errors::CancelledTabulation;
use crate::shared::SparseIntSet;
use crate::FactId;

/// Counters accumulated over a solve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverStatistics {
    /// Worklist iterations performed.
    pub iterations: usize,
    /// Path edges recorded.
    pub path_edges: usize,
    /// Summary edges recorded.
    pub summary_edges: usize,
    /// Times the merge operator was consulted.
    pub merges: usize,
    /// Times an existing summary was replayed at a call site.
    pub summary_replays: usize,
    /// Wall-clock time spent inside `solve`, in milliseconds.
    pub analysis_time_ms: u64,
}

/// Internal marker: the monitor fired.
struct Canceled;

/// The tabulation solver.
///
/// Owns the three memo tables (path edges per entry, summaries per
/// procedure, call-flow edges per callee entry), the seed set and the
/// worklist. `solve` consumes the solver; the returned
/// [`TabulationResult`] can be [resumed](TabulationResult::resume) to add
/// seeds and solve again over the same tables.
pub struct TabulationSolver<P: TabulationProblem> {
    pub(crate) problem: P,
    config: SolverConfig,

    /// Per procedure-entry memo of path edges `(s_p, d1) → (n, d2)`.
    pub(crate) path_edges: FxHashMap<NodeId, LocalPathEdges>,

    /// Per callee-entry memo of call-flow edges `(c, d2) → (s_p, d1)`.
    call_flow_edges: FxHashMap<NodeId, CallFlowEdges>,

    /// Per procedure memo of summary edges.
    pub(crate) summary_edges: FxHashMap<ProcId, LocalSummaryEdges>,

    /// Seeds in insertion order, deduplicated.
    pub(crate) seeds: Vec<PathEdge>,
    seen_seeds: FxHashSet<PathEdge>,

    worklist: Worklist,
    monitor: Box<dyn ProgressMonitor>,

    /// Optional host hook for trimming collaborator-owned caches during very
    /// long solves. Never touches solver memo state.
    cache_evictor: Option<Box<dyn FnMut()>>,

    pub(crate) stats: SolverStatistics,
}

impl<P: TabulationProblem> TabulationSolver<P> {
    pub fn new(problem: P) -> Self {
        Self {
            problem,
            config: SolverConfig::default(),
            path_edges: FxHashMap::default(),
            call_flow_edges: FxHashMap::default(),
            summary_edges: FxHashMap::default(),
            seeds: Vec::new(),
            seen_seeds: FxHashSet::default(),
            worklist: Worklist::new(),
            monitor: Box::new(NeverCanceled),
            cache_evictor: None,
            stats: SolverStatistics::default(),
        }
    }

    /// Replaces the progress monitor.
    pub fn with_monitor(mut self, monitor: impl ProgressMonitor + 'static) -> Self {
        self.monitor = Box::new(monitor);
        self
    }

    /// Replaces the configuration. Rejects out-of-range values.
    pub fn with_config(
        mut self,
        config: SolverConfig,
    ) -> Result<Self, crate::errors::SolverError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Installs a hook invoked every `cache_wipe_interval` iterations so the
    /// host can evict flow-function caches and the like.
    pub fn set_cache_evictor(&mut self, evictor: impl FnMut() + 'static) {
        self.cache_evictor = Some(Box::new(evictor));
    }

    pub fn supergraph(&self) -> &P::Graph {
        self.problem.supergraph()
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Seeds used so far, in insertion order.
    pub fn seeds(&self) -> &[PathEdge] {
        &self.seeds
    }

    /// Inserts a seed and propagates it. May be called before the first
    /// solve or, via [`TabulationResult::resume`], between solves; the
    /// memo tables (and in particular all proven summaries) are reused.
    pub fn add_seed(&mut self, seed: PathEdge) {
        if self.seen_seeds.insert(seed) {
            self.seeds.push(seed);
        }
        self.propagate(seed.entry, seed.entry_fact, seed.target, seed.target_fact);
    }

    /// Runs the tabulation to a fixed point.
    ///
    /// On cancellation the error owns the partial result; every invariant
    /// holds on it, it is just not saturated.
    pub fn solve(mut self) -> Result<TabulationResult<P>, CancelledTabulation<P>> {
        let start = Instant::now();
        self.initialize();
        info!(
            seeds = self.seeds.len(),
            pending = self.worklist.len(),
            "tabulation started"
        );

        let outcome = self.forward_tabulate();
        self.stats.analysis_time_ms += start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                info!(
                    iterations = self.stats.iterations,
                    path_edges = self.stats.path_edges,
                    summary_edges = self.stats.summary_edges,
                    elapsed_ms = self.stats.analysis_time_ms,
                    "tabulation reached fixed point"
                );
                Ok(TabulationResult::new(self))
            }
            Err(Canceled) => {
                debug!(
                    iterations = self.stats.iterations,
                    "tabulation canceled by monitor"
                );
                Err(CancelledTabulation {
                    partial: TabulationResult::new(self),
                })
            }
        }
    }

    fn initialize(&mut self) {
        for seed in self.problem.initial_seeds() {
            self.add_seed(seed);
        }
    }

    /// The main loop: POPL'95 figure 3, with the dispatch on node kind.
    fn forward_tabulate(&mut self) -> Result<(), Canceled> {
        while !self.worklist.is_empty() {
            if self.monitor.is_canceled() {
                return Err(Canceled);
            }
            self.stats.iterations += 1;
            self.monitor.worked(self.stats.iterations);
            if self.stats.iterations % self.config.progress_log_interval == 0 {
                debug!(
                    iterations = self.stats.iterations,
                    pending = self.worklist.len(),
                    next = ?self.worklist.peek(),
                    "tabulation progress"
                );
            }
            self.tend_to_caches();

            let Some(edge) = self.worklist.take(self.problem.domain()) else {
                break;
            };
            trace!(?edge, "tabulate");

            match self.apply_merge(edge) {
                None => {
                    trace!(?edge, "merge suppressed edge");
                }
                Some(j) if j != edge.target_fact => {
                    // Push the merged fact instead of the popped one.
                    self.propagate(edge.entry, edge.entry_fact, edge.target, j);
                }
                Some(_) => {
                    if self.problem.supergraph().is_call(edge.target) {
                        self.process_call(&edge);
                    } else if self.problem.supergraph().is_exit(edge.target) {
                        self.process_exit(&edge);
                    } else {
                        self.process_normal(&edge);
                    }
                }
            }
        }
        Ok(())
    }

    fn tend_to_caches(&mut self) {
        if let Some(evictor) = &mut self.cache_evictor {
            if self.stats.iterations % self.config.cache_wipe_interval == 0 {
                evictor();
            }
        }
    }

    /// Applies the merge operator to a popped edge.
    ///
    /// Without a merge function this is the identity on `target_fact`. With
    /// one, the facts already recorded at `(entry_fact, target)`, which
    /// normally include the popped fact itself, are handed to the operator.
    /// A result equal to the popped fact collapses the recorded set down to
    /// it and lets processing continue; a different result collapses the set
    /// entirely so the caller can propagate the merged fact instead; `None`
    /// drops the edge and leaves the tables alone. Collapsing is what keeps
    /// an always-collapsing operator at one recorded fact per
    /// `(entry fact, block)` at fixed point.
    fn apply_merge(&mut self, edge: PathEdge) -> Option<FactId> {
        let Some(alpha) = self.problem.merge_function() else {
            return Some(edge.target_fact);
        };
        let n_local = self.problem.supergraph().local_block_number(edge.target);
        let merged = {
            let Some(local) = self.path_edges.get(&edge.entry) else {
                // A popped edge was recorded before it was enqueued.
                return Some(edge.target_fact);
            };
            match local.reachable(n_local, edge.entry_fact) {
                None => return Some(edge.target_fact),
                Some(pre) if pre.is_empty() => return Some(edge.target_fact),
                Some(pre) if pre.len() == 1 && pre.contains(edge.target_fact) => {
                    return Some(edge.target_fact)
                }
                Some(pre) => alpha.merge(pre, edge.target_fact),
            }
        };
        self.stats.merges += 1;
        match merged {
            None => None,
            Some(j) => {
                let Some(local) = self.path_edges.get_mut(&edge.entry) else {
                    return Some(j);
                };
                if j == edge.target_fact {
                    local.collapse_to(n_local, edge.entry_fact, j);
                } else {
                    // Remove the superseded facts; the caller propagates the
                    // merged fact, re-recording and enqueueing it.
                    local.collapse(n_local, edge.entry_fact);
                }
                Some(j)
            }
        }
    }

    /// Lines [33–37]: flow across intraprocedural edges.
    fn process_normal(&mut self, edge: &PathEdge) {
        let successors = self.problem.supergraph().succ_nodes(edge.target);
        for m in successors {
            let flow = self.problem.function_map().normal_flow(edge.target, m);
            for d3 in flow.targets(edge.target_fact).iter() {
                self.propagate(edge.entry, edge.entry_fact, m, d3);
            }
        }
    }

    /// Lines [14–19]: flow into callees, replay of proven summaries, normal
    /// fan-out of call blocks (backward problems), and the call-to-return
    /// bypass.
    fn process_call(&mut self, edge: &PathEdge) {
        let c_num = self.problem.supergraph().number(edge.target);
        let return_sites = self.problem.supergraph().return_sites(edge.target);

        // [14–16] for each callee entry reached from this call.
        let callees = self.problem.supergraph().called_nodes(edge.target);
        for callee in callees {
            let reached = self
                .problem
                .function_map()
                .call_flow(edge.target, callee)
                .targets(edge.target_fact);
            if reached.is_empty() {
                continue;
            }
            let proc = self.problem.supergraph().proc_of(callee);
            let s_p_num = self.problem.supergraph().local_block_number(callee);
            let exits = self.problem.supergraph().exits_for_procedure(proc);
            let have_summaries = self.summary_edges.contains_key(&proc);

            for d1 in reached.iter() {
                self.propagate(callee, d1, callee, d1);
                self.call_flow_edges
                    .entry(callee)
                    .or_default()
                    .add_call_edge(c_num, edge.target_fact, d1);

                // Replay summaries already proven for this callee, rather
                // than waiting for its exits to be reprocessed.
                if !have_summaries {
                    continue;
                }
                for &exit in &exits {
                    for return_site in self.problem.supergraph().succ_nodes(exit) {
                        if !return_sites.contains(&return_site) {
                            continue;
                        }
                        let x_num = self.problem.supergraph().local_block_number(exit);
                        let reached_by_summary = self
                            .summary_edges
                            .get(&proc)
                            .and_then(|s| s.summary_edges(s_p_num, x_num, d1))
                            .cloned();
                        let Some(reached_by_summary) = reached_by_summary else {
                            continue;
                        };
                        self.stats.summary_replays += 1;
                        let retf =
                            self.problem
                                .function_map()
                                .return_flow(edge.target, exit, return_site);
                        for d2 in reached_by_summary.iter() {
                            let d5s = match &retf {
                                ReturnFlowFunction::Binary(f) => {
                                    f.targets(edge.target_fact, d2)
                                }
                                ReturnFlowFunction::Unary(f) => f.targets(d2),
                            };
                            for d5 in d5s.iter() {
                                self.propagate(edge.entry, edge.entry_fact, return_site, d5);
                            }
                        }
                    }
                }
            }
        }

        // A call block can have plain intraprocedural successors too (this
        // happens in backward problems); treat those like normal flow.
        let normal_successors = self.problem.supergraph().normal_successors(edge.target);
        for m in normal_successors {
            let flow = self.problem.function_map().normal_flow(edge.target, m);
            for d3 in flow.targets(edge.target_fact).iter() {
                self.propagate(edge.entry, edge.entry_fact, m, d3);
            }
        }

        // [17–19] per return site: the bypass around the callee.
        for return_site in return_sites {
            let flow = if self.has_callee(return_site) {
                self.problem
                    .function_map()
                    .call_to_return_flow(edge.target, return_site)
            } else {
                self.problem
                    .function_map()
                    .call_none_to_return_flow(edge.target, return_site)
            };
            for d3 in flow.targets(edge.target_fact).iter() {
                self.propagate(edge.entry, edge.entry_fact, return_site, d3);
            }
        }
    }

    /// A return site has a callee iff some predecessor lives in another
    /// procedure; such a predecessor must be a callee exit.
    fn has_callee(&self, return_site: NodeId) -> bool {
        let graph = self.problem.supergraph();
        let home = graph.proc_of(return_site);
        graph
            .pred_nodes(return_site)
            .into_iter()
            .any(|pred| graph.proc_of(pred) != home)
    }

    /// Lines [21–32]: record the summary and propagate through every caller
    /// whose call flow reached this exit's entry fact.
    fn process_exit(&mut self, edge: &PathEdge) {
        let proc = self.problem.supergraph().proc_of(edge.target);
        let s_p_n = self.problem.supergraph().local_block_number(edge.entry);
        let x = self.problem.supergraph().local_block_number(edge.target);
        let summaries = self.summary_edges.entry(proc).or_default();
        if !summaries.contains(s_p_n, x, edge.entry_fact, edge.target_fact) {
            summaries.insert_summary_edge(s_p_n, x, edge.entry_fact, edge.target_fact);
            self.stats.summary_edges += 1;
        }

        let succ = self.problem.supergraph().succ_node_numbers(edge.target);
        if succ.is_empty() {
            // Exit of a root procedure: nowhere to return to.
            return;
        }

        // [22] for each caller c of this procedure's entry.
        let callers = self.problem.supergraph().pred_nodes(edge.entry);
        for c in callers {
            // [23] the caller facts that flowed into (s_p, d1).
            let c_global = self.problem.supergraph().number(c);
            let d4s = self
                .call_flow_edges
                .get(&edge.entry)
                .and_then(|cf| cf.call_flow_sources(c_global, edge.entry_fact))
                .cloned();
            if let Some(d4s) = d4s {
                self.propagate_to_return_sites(edge, &succ, c, &d4s);
            }
        }
    }

    /// Lines [23–28] for one caller: push exit facts to the return sites
    /// this exit actually reaches.
    ///
    /// `succ` holds the global numbers of the exit's supergraph successors.
    /// A return site of `c` not in `succ` belongs to a different exit (e.g.
    /// the normal return while this edge sits on the exceptional exit) and
    /// must not receive these facts.
    fn propagate_to_return_sites(
        &mut self,
        edge: &PathEdge,
        succ: &SparseIntSet,
        c: NodeId,
        d4s: &SparseIntSet,
    ) {
        let proc_c = self.problem.supergraph().proc_of(c);
        // The caller procedure may itself have several entry blocks; the new
        // path edges are propagated with respect to each of them.
        let entries = self.problem.supergraph().entries_for_procedure(proc_c);
        let return_sites = self.problem.supergraph().return_sites(c);

        for return_site in return_sites {
            if !succ.contains(self.problem.supergraph().number(return_site)) {
                continue;
            }
            match self
                .problem
                .function_map()
                .return_flow(c, edge.target, return_site)
            {
                ReturnFlowFunction::Binary(retf) => {
                    for d4 in d4s.iter() {
                        let d5s = retf.targets(d4, edge.target_fact);
                        for d5 in d5s.iter() {
                            self.propagate_through_entries(&entries, c, d4, return_site, d5);
                        }
                    }
                }
                ReturnFlowFunction::Unary(retf) => {
                    let d5s = retf.targets(edge.target_fact);
                    for d4 in d4s.iter() {
                        for d5 in d5s.iter() {
                            self.propagate_through_entries(&entries, c, d4, return_site, d5);
                        }
                    }
                }
            }
        }
    }

    /// [26–28] for each caller entry `s_p'` and each `d3` with a recorded
    /// path edge `(s_p', d3) → (c, d4)`, extend the path to the return site.
    fn propagate_through_entries(
        &mut self,
        entries: &[NodeId],
        c: NodeId,
        d4: FactId,
        return_site: NodeId,
        d5: FactId,
    ) {
        for &s_p in entries {
            let d3s = self.inverse_path_edges(s_p, c, d4).cloned();
            if let Some(d3s) = d3s {
                for d3 in d3s.iter() {
                    self.propagate(s_p, d3, return_site, d5);
                }
            }
        }
    }

    /// The set of `d1` with a recorded path edge `(s_p, d1) → (n, d2)`.
    /// `s_p` must be an entry of `n`'s procedure.
    fn inverse_path_edges(&self, s_p: NodeId, n: NodeId, d2: FactId) -> Option<&SparseIntSet> {
        let number = self.problem.supergraph().local_block_number(n);
        self.path_edges.get(&s_p)?.inverse(number, d2)
    }

    /// Records the path edge `(s_p, i) → (n, j)` and, iff it is new,
    /// enqueues it. The sole mutator of the path-edge tables.
    fn propagate(&mut self, s_p: NodeId, i: FactId, n: NodeId, j: FactId) {
        let number = self.problem.supergraph().local_block_number(n);
        let merge_mode = self.problem.merge_function().is_some();
        let local = self
            .path_edges
            .entry(s_p)
            .or_insert_with(|| LocalPathEdges::new(merge_mode));
        if !local.contains(i, number, j) {
            local.add_path_edge(i, number, j);
            self.stats.path_edges += 1;
            trace!(
                entry = ?s_p,
                d1 = i,
                node = ?n,
                d2 = j,
                "propagate"
            );
            self.worklist
                .insert(PathEdge::new(s_p, i, n, j), self.problem.domain());
        }
    }
}
