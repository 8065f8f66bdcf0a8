//! Control flow edge representation for the recovered graph.

use serde::{Deserialize, Serialize};

use crate::{cfg::NodeId, lift::JumpKind};

/// An edge in the control flow graph.
///
/// Each edge connects a source node to a target node and carries the
/// [`JumpKind`] the lifter reported for the transfer. Two edges between the
/// same node pair exist only when the lifter genuinely reported both
/// transfers; each node is expanded exactly once, so expansion never
/// duplicates edges on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgEdge {
    source: NodeId,
    target: NodeId,
    jump_kind: JumpKind,
}

impl CfgEdge {
    /// Creates a new edge.
    #[must_use]
    pub fn new(source: NodeId, target: NodeId, jump_kind: JumpKind) -> Self {
        CfgEdge {
            source,
            target,
            jump_kind,
        }
    }

    /// The source node of this edge.
    #[must_use]
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// The target node of this edge.
    #[must_use]
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The kind of control transfer this edge represents.
    #[must_use]
    pub fn jump_kind(&self) -> JumpKind {
        self.jump_kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_accessors() {
        let edge = CfgEdge::new(NodeId::new(0), NodeId::new(1), JumpKind::Call);
        assert_eq!(edge.source(), NodeId::new(0));
        assert_eq!(edge.target(), NodeId::new(1));
        assert_eq!(edge.jump_kind(), JumpKind::Call);
    }
}
