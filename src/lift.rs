//! The block lifter boundary and its exchange types.
//!
//! CFG recovery never decodes instructions itself. It drives an external
//! [`BlockLifter`]: a service that, given an [`Address`] and an opaque
//! [`MachineState`], produces the basic block's successor addresses, each
//! tagged with a [`JumpKind`] and optionally carrying the machine state that
//! flows along that edge. Symbolic executors, emulators, and table-driven
//! test doubles all plug in through this one trait.
//!
//! # Examples
//!
//! ```rust
//! use binflow::{Address, BlockLifter, BlockSuccessor, JumpKind, MachineState, Result};
//!
//! /// A lifter where every block falls through to the next 4-byte slot.
//! struct FallThrough;
//!
//! impl BlockLifter for FallThrough {
//!     fn lift(&self, address: Address, _state: &MachineState) -> Result<Vec<BlockSuccessor>> {
//!         Ok(vec![BlockSuccessor::new(
//!             Address::new(address.value() + 4),
//!             JumpKind::Jump,
//!         )])
//!     }
//! }
//! ```

use std::{any::Any, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::Result;

/// A byte offset in the analyzed program's address space.
///
/// Addresses are opaque beyond ordering and equality: the engine never
/// interprets them, it only uses them to identify blocks and to form
/// call-string identities. Formatting is always hexadecimal.
///
/// # Examples
///
/// ```rust
/// use binflow::Address;
///
/// let addr = Address::new(0x401000);
/// assert_eq!(addr.value(), 0x401000);
/// assert_eq!(addr.to_string(), "0x401000");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u64);

impl Address {
    /// Creates a new `Address` from a raw offset value.
    #[must_use]
    #[inline]
    pub const fn new(value: u64) -> Self {
        Address(value)
    }

    /// Returns the raw offset value of this address.
    #[must_use]
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:#x})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for Address {
    #[inline]
    fn from(value: u64) -> Self {
        Address(value)
    }
}

impl From<Address> for u64 {
    #[inline]
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Classification of a control transfer reported by the lifter.
///
/// The jump kind determines how the calling context of the target node is
/// derived from the source node's context, and it labels the resulting CFG
/// edge. The enumeration is closed; lifters that cannot classify a transfer
/// report [`JumpKind::Unknown`], which leaves the context untouched.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize,
)]
pub enum JumpKind {
    /// A call into a function; pushes the call site onto the call-string.
    Call,
    /// A return out of a function; pops the most recent call-string entry.
    Return,
    /// A conditional or unconditional jump; context-neutral.
    Jump,
    /// The synthetic fall-through edge a call leaves behind; context-neutral.
    FakeReturn,
    /// A system call; context-neutral.
    Syscall,
    /// A transfer the lifter could not classify; context-neutral.
    Unknown,
}

impl JumpKind {
    /// Returns `true` if this transfer is a call.
    #[must_use]
    pub const fn is_call(self) -> bool {
        matches!(self, JumpKind::Call)
    }

    /// Returns `true` if this transfer is a return.
    #[must_use]
    pub const fn is_return(self) -> bool {
        matches!(self, JumpKind::Return)
    }
}

/// An opaque, cheaply cloneable machine-state snapshot.
///
/// The engine treats states as a black box: it receives them from the
/// lifter, threads them through the worklist, and hands them back into
/// [`BlockLifter::lift`]. Lifters downcast to their own concrete state type.
/// States are never serialized; a reloaded graph carries no state snapshots.
///
/// # Examples
///
/// ```rust
/// use binflow::MachineState;
///
/// #[derive(Debug, PartialEq)]
/// struct Registers {
///     sp: u64,
/// }
///
/// let state = MachineState::new(Registers { sp: 0x7fff_0000 });
/// assert_eq!(state.downcast_ref::<Registers>().unwrap().sp, 0x7fff_0000);
/// assert!(state.downcast_ref::<u32>().is_none());
/// ```
#[derive(Clone)]
pub struct MachineState(Arc<dyn Any + Send + Sync>);

impl MachineState {
    /// Wraps an arbitrary value as an opaque machine state.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        MachineState(Arc::new(value))
    }

    /// Returns the empty state used when no initial state is configured.
    #[must_use]
    pub fn empty() -> Self {
        MachineState(Arc::new(()))
    }

    /// Attempts to view the wrapped value as a concrete type.
    ///
    /// Returns `None` if the state was created with a different type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns `true` if the wrapped value has the given concrete type.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MachineState").finish_non_exhaustive()
    }
}

/// One successor reported by the lifter for a lifted block.
#[derive(Debug, Clone)]
pub struct BlockSuccessor {
    /// Target address of the control transfer.
    pub address: Address,
    /// Classification of the transfer.
    pub jump_kind: JumpKind,
    /// Machine state flowing along this edge, if the lifter tracks one.
    ///
    /// When absent, the engine re-uses the state the source block was
    /// lifted with.
    pub state: Option<MachineState>,
}

impl BlockSuccessor {
    /// Creates a successor without an attached state.
    #[must_use]
    pub fn new(address: Address, jump_kind: JumpKind) -> Self {
        BlockSuccessor {
            address,
            jump_kind,
            state: None,
        }
    }

    /// Creates a successor carrying the state that flows along the edge.
    #[must_use]
    pub fn with_state(address: Address, jump_kind: JumpKind, state: MachineState) -> Self {
        BlockSuccessor {
            address,
            jump_kind,
            state: Some(state),
        }
    }
}

/// The external service that turns an address into a block's successors.
///
/// Implementations may fail for individual addresses (undecodable bytes,
/// unmapped memory, executor timeouts). How a failure affects the overall
/// build depends on the analysis's resilience mode: captured-and-logged by
/// default, aborting under fail-fast.
///
/// The engine assumes nothing about `state` beyond passing it back into
/// `lift` unchanged.
pub trait BlockLifter: Send + Sync {
    /// Lifts the basic block at `address` under the given machine state.
    ///
    /// # Errors
    ///
    /// Returns an error if the block cannot be lifted. The engine normalizes
    /// any error returned here into [`Error::Lift`](crate::Error::Lift) for
    /// the failing address.
    fn lift(&self, address: Address, state: &MachineState) -> Result<Vec<BlockSuccessor>>;
}
