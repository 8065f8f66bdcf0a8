//! The worklist that recovers a control flow graph from a lifter.
//!
//! [`CfgBuilder`] drives a forced-execution exploration: starting from the
//! configured entry addresses it lifts each block, follows every reported
//! successor, and keeps going until no `(address, call-string)` pair remains
//! unexpanded. Because call-strings are bounded and addresses are finite,
//! the fixpoint always terminates.

use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    analysis::{ErrorLog, Resilience},
    cfg::{CallString, CfgEdge, CfgNode, ControlFlowGraph, LeafReason, NodeId},
    lift::{Address, BlockLifter, MachineState},
    Error, Result,
};

/// Configuration for a control flow graph build.
///
/// The defaults give a call-site-sensitive graph (`context_sensitivity`
/// of 1) with no depth bound, no avoided addresses, and no retained
/// per-node states.
#[derive(Debug, Clone)]
pub struct CfgOptions {
    context_sensitivity: usize,
    call_depth: Option<u32>,
    starts: Vec<Address>,
    avoid: BTreeSet<Address>,
    keep_input_state: bool,
    initial_state: Option<MachineState>,
    fail_fast: bool,
}

impl Default for CfgOptions {
    fn default() -> Self {
        CfgOptions {
            context_sensitivity: 1,
            call_depth: None,
            starts: Vec::new(),
            avoid: BTreeSet::new(),
            keep_input_state: false,
            initial_state: None,
            fail_fast: false,
        }
    }
}

impl CfgOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        CfgOptions::default()
    }

    /// Sets the maximum call-string length. Zero collapses all contexts.
    #[must_use]
    pub fn with_context_sensitivity(mut self, level: usize) -> Self {
        self.context_sensitivity = level;
        self
    }

    /// Bounds how many nested calls the exploration follows.
    ///
    /// Callees past the bound become [`LeafReason::CallDepth`] leaves. The
    /// bound is independent of the call-string length.
    #[must_use]
    pub fn with_call_depth(mut self, depth: u32) -> Self {
        self.call_depth = Some(depth);
        self
    }

    /// Replaces the start addresses the exploration seeds from.
    #[must_use]
    pub fn with_starts(mut self, starts: impl IntoIterator<Item = Address>) -> Self {
        self.starts = starts.into_iter().collect();
        self
    }

    /// Adds a single start address.
    #[must_use]
    pub fn with_start(mut self, start: Address) -> Self {
        self.starts.push(start);
        self
    }

    /// Marks addresses that must never be expanded.
    ///
    /// An avoided address still appears in the graph when an edge reaches
    /// it, as a [`LeafReason::Avoided`] leaf, but its block is never lifted.
    #[must_use]
    pub fn with_avoid(mut self, avoid: impl IntoIterator<Item = Address>) -> Self {
        self.avoid.extend(avoid);
        self
    }

    /// Retains a snapshot of the incoming machine state on every node.
    #[must_use]
    pub fn with_keep_input_state(mut self, keep: bool) -> Self {
        self.keep_input_state = keep;
        self
    }

    /// Sets the machine state the start addresses are lifted with.
    #[must_use]
    pub fn with_initial_state(mut self, state: MachineState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Aborts the build on the first lift failure instead of recording it.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// The configured start addresses.
    #[must_use]
    pub fn starts(&self) -> &[Address] {
        &self.starts
    }

    /// Whether any start address is configured.
    #[must_use]
    pub(crate) fn has_starts(&self) -> bool {
        !self.starts.is_empty()
    }

    /// Whether an explicit initial machine state is configured.
    #[must_use]
    pub(crate) fn has_initial_state(&self) -> bool {
        self.initial_state.is_some()
    }
}

/// A block waiting to be lifted, with its exploration depth and the machine
/// state it will be lifted under.
struct PendingBlock {
    node: NodeId,
    depth: u32,
    state: MachineState,
}

/// Drives the worklist exploration for one graph build.
pub struct CfgBuilder<'a> {
    lifter: &'a dyn BlockLifter,
    options: CfgOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> CfgBuilder<'a> {
    /// Creates a builder over `lifter` with the given options.
    #[must_use]
    pub fn new(lifter: &'a dyn BlockLifter, options: CfgOptions) -> Self {
        CfgBuilder {
            lifter,
            options,
            cancel: None,
        }
    }

    /// Installs a cancellation token checked once per worklist step.
    ///
    /// When the flag is raised the build stops with [`Error::Cancelled`].
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Runs the exploration to its fixpoint and freezes the result.
    ///
    /// Lift failures are recorded in `errors` and leave a
    /// [`LeafReason::LiftFailed`] leaf behind, unless fail-fast is set, in
    /// which case the first failure aborts the build.
    pub fn build(self, errors: &ErrorLog) -> Result<ControlFlowGraph> {
        let resilience = Resilience::new(errors, self.options.fail_fast);
        let level = self.options.context_sensitivity;

        let mut nodes: Vec<CfgNode> = Vec::new();
        let mut edges: Vec<CfgEdge> = Vec::new();
        let mut expanded: Vec<bool> = Vec::new();
        let mut index: HashMap<(Address, CallString), NodeId> = HashMap::new();
        let mut worklist: VecDeque<PendingBlock> = VecDeque::new();

        let initial_state = self
            .options
            .initial_state
            .clone()
            .unwrap_or_else(MachineState::empty);

        for &start in &self.options.starts {
            // An avoided entry contributes nothing, not even a node.
            if self.options.avoid.contains(&start) {
                continue;
            }
            let id = ensure_node(&mut index, &mut nodes, &mut expanded, start, CallString::empty());
            worklist.push_back(PendingBlock {
                node: id,
                depth: 0,
                state: initial_state.clone(),
            });
        }

        while let Some(job) = worklist.pop_front() {
            if let Some(cancel) = &self.cancel {
                if cancel.load(Ordering::Relaxed) {
                    return Err(Error::Cancelled);
                }
            }
            if expanded[job.node.index()] {
                continue;
            }
            expanded[job.node.index()] = true;

            let address = nodes[job.node.index()].address();
            let call_string = nodes[job.node.index()].call_string().clone();

            // A node queued after first appearing as a depth-bound
            // placeholder is now genuinely expanded.
            nodes[job.node.index()].set_leaf(None);
            if self.options.keep_input_state {
                nodes[job.node.index()].set_input_state(Some(job.state.clone()));
            }

            let lifted = resilience.run_named(&address.to_string(), || {
                self.lifter.lift(address, &job.state).map_err(|err| match err {
                    lift @ Error::Lift { .. } => lift,
                    other => Error::Lift {
                        address,
                        message: other.to_string(),
                    },
                })
            })?;

            let successors = match lifted {
                Some(successors) => successors,
                None => {
                    nodes[job.node.index()].set_leaf(Some(LeafReason::LiftFailed));
                    continue;
                }
            };

            if successors.is_empty() {
                nodes[job.node.index()].set_leaf(Some(LeafReason::ProgramExit));
                continue;
            }

            nodes[job.node.index()]
                .set_out_jump_kinds(successors.iter().map(|s| s.jump_kind).collect());

            for successor in successors {
                let kind = successor.jump_kind;
                let succ_string = call_string.transition(kind, address, level);
                let succ_depth = if kind.is_call() {
                    job.depth.saturating_add(1)
                } else if kind.is_return() {
                    job.depth.saturating_sub(1)
                } else {
                    job.depth
                };

                let succ_id = ensure_node(
                    &mut index,
                    &mut nodes,
                    &mut expanded,
                    successor.address,
                    succ_string,
                );
                edges.push(CfgEdge::new(job.node, succ_id, kind));

                if expanded[succ_id.index()] {
                    continue;
                }
                if self.options.avoid.contains(&successor.address) {
                    nodes[succ_id.index()].set_leaf(Some(LeafReason::Avoided));
                    continue;
                }
                if let Some(max_depth) = self.options.call_depth {
                    if succ_depth > max_depth {
                        if !nodes[succ_id.index()].is_leaf() {
                            nodes[succ_id.index()].set_leaf(Some(LeafReason::CallDepth));
                        }
                        continue;
                    }
                }

                let succ_state = successor
                    .state
                    .unwrap_or_else(|| job.state.clone());
                worklist.push_back(PendingBlock {
                    node: succ_id,
                    depth: succ_depth,
                    state: succ_state,
                });
            }
        }

        Ok(ControlFlowGraph::freeze(
            nodes,
            edges,
            self.options.starts,
            self.options.avoid,
            level,
            self.options.call_depth,
            self.options.keep_input_state,
        ))
    }
}

/// Interns an `(address, call-string)` pair, allocating a node on first
/// sight.
fn ensure_node(
    index: &mut HashMap<(Address, CallString), NodeId>,
    nodes: &mut Vec<CfgNode>,
    expanded: &mut Vec<bool>,
    address: Address,
    call_string: CallString,
) -> NodeId {
    *index
        .entry((address, call_string.clone()))
        .or_insert_with(|| {
            let id = NodeId::new(nodes.len());
            nodes.push(CfgNode::new(address, call_string));
            expanded.push(false);
            id
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lift::JumpKind, test::ScriptedLifter};

    fn addr(value: u64) -> Address {
        Address::new(value)
    }

    #[test]
    fn test_linear_program() {
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x2000, JumpKind::Jump)]);
        lifter.exit(0x2000);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(&lifter, CfgOptions::new().with_start(addr(0x1000)))
            .build(&errors)
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(errors.is_empty());

        let exit = graph.any_node(addr(0x2000)).unwrap();
        assert_eq!(
            graph.node(exit).unwrap().leaf(),
            Some(LeafReason::ProgramExit)
        );
    }

    #[test]
    fn test_call_creates_context_variant() {
        // main at 0x1000 calls helper at 0x2000, which returns to 0x1008.
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x2000, JumpKind::Call)]);
        lifter.block(0x2000, &[(0x1008, JumpKind::Return)]);
        lifter.exit(0x1008);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(&lifter, CfgOptions::new().with_start(addr(0x1000)))
            .build(&errors)
            .unwrap();

        let helper = graph.any_node(addr(0x2000)).unwrap();
        assert_eq!(
            graph.node(helper).unwrap().call_string(),
            &CallString::from_callers([addr(0x1000)])
        );

        // The return pops the caller, landing back in the empty context.
        let after = graph.any_node(addr(0x1008)).unwrap();
        assert!(graph.node(after).unwrap().call_string().is_empty());
    }

    #[test]
    fn test_shared_callee_splits_by_caller() {
        // Two call sites into the same helper produce two context variants.
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x3000, JumpKind::Call)]);
        lifter.block(0x2000, &[(0x3000, JumpKind::Call)]);
        lifter.exit(0x3000);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(
            &lifter,
            CfgOptions::new().with_starts([addr(0x1000), addr(0x2000)]),
        )
        .build(&errors)
        .unwrap();

        assert_eq!(graph.all_nodes(addr(0x3000)).len(), 2);
    }

    #[test]
    fn test_level_zero_collapses_contexts() {
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x3000, JumpKind::Call)]);
        lifter.block(0x2000, &[(0x3000, JumpKind::Call)]);
        lifter.exit(0x3000);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(
            &lifter,
            CfgOptions::new()
                .with_starts([addr(0x1000), addr(0x2000)])
                .with_context_sensitivity(0),
        )
        .build(&errors)
        .unwrap();

        // Both calls land on the single context-free helper node.
        assert_eq!(graph.all_nodes(addr(0x3000)).len(), 1);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_call_depth_bound() {
        // A -> B -> C as nested calls; a bound of 1 stops before C.
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x2000, JumpKind::Call)]);
        lifter.block(0x2000, &[(0x3000, JumpKind::Call)]);
        lifter.exit(0x3000);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(
            &lifter,
            CfgOptions::new().with_start(addr(0x1000)).with_call_depth(1),
        )
        .build(&errors)
        .unwrap();

        let c = graph.any_node(addr(0x3000)).unwrap();
        assert_eq!(graph.node(c).unwrap().leaf(), Some(LeafReason::CallDepth));
        assert!(graph.node(c).unwrap().out_jump_kinds().is_empty());
    }

    #[test]
    fn test_depth_placeholder_cleared_by_shallower_path() {
        // 0x3000 is cut when reached through the nested call from 0x1000,
        // but the direct entry at 0x2000 reaches the same (address,
        // context) pair within the bound.
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x2000, JumpKind::Call)]);
        lifter.block(0x2000, &[(0x3000, JumpKind::Call)]);
        lifter.exit(0x3000);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(
            &lifter,
            CfgOptions::new()
                .with_starts([addr(0x1000), addr(0x2000)])
                .with_call_depth(1),
        )
        .build(&errors)
        .unwrap();

        let target = graph
            .node_at(addr(0x3000), &CallString::from_callers([addr(0x2000)]))
            .unwrap();
        assert_eq!(
            graph.node(target).unwrap().leaf(),
            Some(LeafReason::ProgramExit)
        );
    }

    #[test]
    fn test_avoided_address_is_terminal() {
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x2000, JumpKind::Jump), (0x3000, JumpKind::Jump)]);
        lifter.exit(0x2000);
        lifter.exit(0x3000);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(
            &lifter,
            CfgOptions::new()
                .with_start(addr(0x1000))
                .with_avoid([addr(0x3000)]),
        )
        .build(&errors)
        .unwrap();

        let avoided = graph.any_node(addr(0x3000)).unwrap();
        assert_eq!(graph.node(avoided).unwrap().leaf(), Some(LeafReason::Avoided));
        // Avoided blocks are never lifted, so no failure is recorded.
        assert!(errors.is_empty());

        let taken = graph.any_node(addr(0x2000)).unwrap();
        assert_eq!(
            graph.node(taken).unwrap().leaf(),
            Some(LeafReason::ProgramExit)
        );
    }

    #[test]
    fn test_avoided_entry_contributes_nothing() {
        let mut lifter = ScriptedLifter::new();
        lifter.exit(0x1000);
        lifter.exit(0x2000);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(
            &lifter,
            CfgOptions::new()
                .with_starts([addr(0x1000), addr(0x2000)])
                .with_avoid([addr(0x1000)]),
        )
        .build(&errors)
        .unwrap();

        assert!(graph.any_node(addr(0x1000)).is_none());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_lift_failure_recorded_and_recovered() {
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x2000, JumpKind::Jump), (0x3000, JumpKind::Jump)]);
        lifter.fail(0x2000);
        lifter.exit(0x3000);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(&lifter, CfgOptions::new().with_start(addr(0x1000)))
            .build(&errors)
            .unwrap();

        assert_eq!(errors.len(), 1);
        assert!(errors.named("0x2000").is_some());

        let failed = graph.any_node(addr(0x2000)).unwrap();
        assert_eq!(
            graph.node(failed).unwrap().leaf(),
            Some(LeafReason::LiftFailed)
        );
        assert!(graph.node(failed).unwrap().is_failure_leaf());

        // Exploration continued past the failure.
        assert!(graph.any_node(addr(0x3000)).is_some());
    }

    #[test]
    fn test_fail_fast_aborts() {
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x2000, JumpKind::Jump)]);
        lifter.fail(0x2000);

        let errors = ErrorLog::new();
        let result = CfgBuilder::new(
            &lifter,
            CfgOptions::new().with_start(addr(0x1000)).with_fail_fast(true),
        )
        .build(&errors);

        assert!(matches!(result, Err(Error::Lift { .. })));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_cancellation() {
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x2000, JumpKind::Jump)]);
        lifter.exit(0x2000);

        let cancel = Arc::new(AtomicBool::new(true));
        let errors = ErrorLog::new();
        let result = CfgBuilder::new(&lifter, CfgOptions::new().with_start(addr(0x1000)))
            .with_cancel_token(cancel)
            .build(&errors);

        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_keep_input_state_snapshots() {
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x2000, JumpKind::Jump)]);
        lifter.exit(0x2000);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(
            &lifter,
            CfgOptions::new()
                .with_start(addr(0x1000))
                .with_keep_input_state(true)
                .with_initial_state(MachineState::new(42u32)),
        )
        .build(&errors)
        .unwrap();

        let entry = graph.any_node(addr(0x1000)).unwrap();
        let state = graph.node(entry).unwrap().input_state().unwrap();
        assert_eq!(state.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn test_recursion_terminates() {
        // Self-recursive call: the bounded call-string saturates and the
        // fixpoint stops revisiting known pairs.
        let mut lifter = ScriptedLifter::new();
        lifter.block(0x1000, &[(0x1000, JumpKind::Call)]);

        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(
            &lifter,
            CfgOptions::new()
                .with_start(addr(0x1000))
                .with_context_sensitivity(2),
        )
        .build(&errors)
        .unwrap();

        // Contexts [], [0x1000], [0x1000, 0x1000] and no more.
        assert_eq!(graph.node_count(), 3);
    }
}
