//! Node identity and payload for the recovered control flow graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    cfg::CallString,
    lift::{Address, JumpKind, MachineState},
};

/// A strongly-typed identifier for nodes within a control flow graph.
///
/// `NodeId` wraps a `usize` index, providing type safety to prevent
/// accidental mixing of node indices with other integer values. Node IDs
/// are assigned sequentially starting from 0 as the build discovers nodes,
/// and stay valid for the lifetime of the frozen graph.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw index value.
    ///
    /// Primarily intended for internal use and testing; normal usage
    /// obtains IDs from graph queries.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw index value of this node identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Why a node has no outgoing expansion.
///
/// The distinction matters downstream: [`ProgramExit`](Self::ProgramExit)
/// means the program genuinely ends here, while the other reasons mean the
/// analysis stopped by policy or by failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafReason {
    /// The lifter reported no successors; the program ends here.
    ProgramExit,
    /// The lifter failed for this block; details are in the error log.
    LiftFailed,
    /// A call target beyond the configured call-depth bound.
    CallDepth,
    /// A successor inside the avoid-set.
    Avoided,
}

impl LeafReason {
    /// Returns `true` if the node is a leaf because the lifter failed,
    /// rather than by design or by configured bound.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, LeafReason::LiftFailed)
    }
}

/// A context-qualified basic block in the recovered graph.
///
/// Identity is the `(address, call_string)` pair; the build guarantees at
/// most one node exists per pair, which is exactly how the same code
/// address yields multiple nodes under different calling contexts.
///
/// Outgoing jump kinds are populated when the node is expanded; the input
/// state snapshot is retained only when the build was configured to keep
/// it, and is never part of the serialized form.
#[derive(Clone, Serialize, Deserialize)]
pub struct CfgNode {
    address: Address,
    call_string: CallString,
    out_jump_kinds: Vec<JumpKind>,
    leaf: Option<LeafReason>,
    #[serde(skip)]
    input_state: Option<MachineState>,
}

impl CfgNode {
    pub(crate) fn new(address: Address, call_string: CallString) -> Self {
        CfgNode {
            address,
            call_string,
            out_jump_kinds: Vec::new(),
            leaf: None,
            input_state: None,
        }
    }

    /// The code address of this block.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// The calling context under which this block was reached.
    #[must_use]
    pub fn call_string(&self) -> &CallString {
        &self.call_string
    }

    /// Jump kinds of this node's outgoing edges, in lifter order.
    ///
    /// Empty until the node has been expanded.
    #[must_use]
    pub fn out_jump_kinds(&self) -> &[JumpKind] {
        &self.out_jump_kinds
    }

    /// Why this node is a leaf, if it is one.
    #[must_use]
    pub fn leaf(&self) -> Option<LeafReason> {
        self.leaf
    }

    /// Returns `true` if this node has no outgoing expansion.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    /// Returns `true` if this node is a leaf because lifting failed.
    #[must_use]
    pub fn is_failure_leaf(&self) -> bool {
        self.leaf.is_some_and(LeafReason::is_failure)
    }

    /// The retained input-state snapshot, if the build kept it.
    #[must_use]
    pub fn input_state(&self) -> Option<&MachineState> {
        self.input_state.as_ref()
    }

    pub(crate) fn set_out_jump_kinds(&mut self, kinds: Vec<JumpKind>) {
        self.out_jump_kinds = kinds;
    }

    pub(crate) fn set_leaf(&mut self, reason: Option<LeafReason>) {
        self.leaf = reason;
    }

    pub(crate) fn set_input_state(&mut self, state: Option<MachineState>) {
        self.input_state = state;
    }
}

impl fmt::Debug for CfgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CfgNode")
            .field("address", &self.address)
            .field("call_string", &self.call_string)
            .field("out_jump_kinds", &self.out_jump_kinds)
            .field("leaf", &self.leaf)
            .field("has_input_state", &self.input_state.is_some())
            .finish()
    }
}

impl fmt::Display for CfgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.address, self.call_string)
    }
}
