//! Bounded call-string identity for context-sensitive nodes.
//!
//! Two visits to the same address are the same CFG node only if they carry
//! the same calling history. That history is the [`CallString`]: the ordered
//! sequence of call-site addresses leading to the block, truncated to the
//! configured context-sensitivity level. The truncation makes the context
//! space finite, which is what guarantees the worklist terminates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lift::{Address, JumpKind};

/// An ordered, bounded history of caller addresses.
///
/// Entries are stored oldest first; the most recent caller is last. The
/// length bound is not a property of the value itself — it is applied by
/// [`transition`](Self::transition), which enforces the configured level on
/// every call push. Level `0` collapses every context to the empty
/// call-string, giving each address exactly one node regardless of callers.
///
/// Ordering is lexicographic over the caller sequence, which gives the
/// graph's per-address queries a deterministic tie-break.
///
/// # Examples
///
/// ```rust
/// use binflow::{Address, CallString, JumpKind};
///
/// let empty = CallString::empty();
/// let inside = empty.transition(JumpKind::Call, Address::new(0x1000), 2);
/// assert_eq!(inside.callers(), &[Address::new(0x1000)]);
///
/// let back = inside.transition(JumpKind::Return, Address::new(0x2000), 2);
/// assert!(back.is_empty());
/// ```
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallString(Vec<Address>);

impl CallString {
    /// Returns the empty call-string, the context of every entry point.
    #[must_use]
    pub fn empty() -> Self {
        CallString(Vec::new())
    }

    /// Creates a call-string directly from caller addresses, oldest first.
    ///
    /// No truncation is applied; this is an escape hatch for lookups and
    /// tests, not the transition path.
    #[must_use]
    pub fn from_callers(callers: impl IntoIterator<Item = Address>) -> Self {
        CallString(callers.into_iter().collect())
    }

    /// Returns the caller addresses, oldest first.
    #[must_use]
    pub fn callers(&self) -> &[Address] {
        &self.0
    }

    /// Returns the number of tracked callers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no callers are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Derives the context after a control transfer.
    ///
    /// Pure function of its inputs:
    ///
    /// - `Call` pushes `call_site` and keeps only the `level` most recent
    ///   callers, dropping the oldest first
    /// - `Return` pops the most recent caller; popping an empty call-string
    ///   is a no-op (returning past the tracked context loses precision,
    ///   it is not an error)
    /// - `Jump`, `FakeReturn`, `Syscall`, and `Unknown` leave the context
    ///   unchanged
    #[must_use]
    pub fn transition(&self, jump_kind: JumpKind, call_site: Address, level: usize) -> CallString {
        match jump_kind {
            JumpKind::Call => {
                let mut callers = self.0.clone();
                callers.push(call_site);
                if callers.len() > level {
                    callers.drain(..callers.len() - level);
                }
                CallString(callers)
            }
            JumpKind::Return => {
                let mut callers = self.0.clone();
                callers.pop();
                CallString(callers)
            }
            JumpKind::Jump | JumpKind::FakeReturn | JumpKind::Syscall | JumpKind::Unknown => {
                self.clone()
            }
        }
    }
}

impl fmt::Debug for CallString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for CallString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, caller) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{caller}")?;
        }
        write!(f, "]")
    }
}
