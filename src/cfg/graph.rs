//! The frozen, queryable control flow graph.
//!
//! A [`ControlFlowGraph`] is produced once by a build and never mutated
//! afterwards; every query is a pure lookup. Alongside nodes and edges it
//! records the configuration that shaped it (entries, avoid-set, context
//! level, call-depth bound), which is enough to reproduce the build or to
//! reload a persisted graph without re-running it.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    cfg::{CallString, CfgEdge, CfgNode, LeafReason, NodeId},
    lift::{Address, JumpKind},
};

/// The serialized shape of a graph: nodes, edges, and build configuration.
///
/// Adjacency and per-address indices are derived data and are rebuilt when
/// a persisted graph is reloaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphData {
    nodes: Vec<CfgNode>,
    edges: Vec<CfgEdge>,
    entries: Vec<Address>,
    avoid: BTreeSet<Address>,
    context_sensitivity: usize,
    call_depth: Option<u32>,
    keep_input_state: bool,
}

/// A context-sensitive control flow graph recovered from a binary program.
///
/// Nodes are `(address, call-string)` pairs, edges are jump-kind-tagged
/// transfers between them. The graph is a finite multigraph, frozen after
/// its build: node and edge counts only grow during recovery and never
/// change afterwards.
///
/// # Queries
///
/// - [`any_node`](Self::any_node) / [`all_nodes`](Self::all_nodes) - look up
///   nodes by address across context variants
/// - [`predecessors`](Self::predecessors) / [`successors`](Self::successors) /
///   [`successors_with_jumpkind`](Self::successors_with_jumpkind) - adjacency
/// - [`leaves`](Self::leaves) - terminal nodes with the reason they stopped,
///   distinguishing real program exits from failures and configured bounds
///
/// # Determinism
///
/// `any_node` breaks ties between context variants by the lexicographically
/// smallest call-string, so repeated queries over the same graph always
/// agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "GraphData", into = "GraphData")]
pub struct ControlFlowGraph {
    nodes: Vec<CfgNode>,
    edges: Vec<CfgEdge>,
    entries: Vec<Address>,
    avoid: BTreeSet<Address>,
    context_sensitivity: usize,
    call_depth: Option<u32>,
    keep_input_state: bool,
    /// Outgoing edge indices per node.
    outgoing: Vec<Vec<usize>>,
    /// Incoming edge indices per node.
    incoming: Vec<Vec<usize>>,
    /// Identity index over `(address, call-string)` pairs.
    index: HashMap<(Address, CallString), NodeId>,
    /// Context variants per address, sorted by call-string.
    by_address: HashMap<Address, Vec<NodeId>>,
}

impl ControlFlowGraph {
    /// Assembles a frozen graph from the build's raw parts.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn freeze(
        nodes: Vec<CfgNode>,
        edges: Vec<CfgEdge>,
        entries: Vec<Address>,
        avoid: BTreeSet<Address>,
        context_sensitivity: usize,
        call_depth: Option<u32>,
        keep_input_state: bool,
    ) -> Self {
        let mut graph = ControlFlowGraph {
            nodes,
            edges,
            entries,
            avoid,
            context_sensitivity,
            call_depth,
            keep_input_state,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            index: HashMap::new(),
            by_address: HashMap::new(),
        };
        graph.rebuild_indices();
        graph
    }

    fn rebuild_indices(&mut self) {
        self.outgoing = vec![Vec::new(); self.nodes.len()];
        self.incoming = vec![Vec::new(); self.nodes.len()];
        for (edge_idx, edge) in self.edges.iter().enumerate() {
            if let Some(out) = self.outgoing.get_mut(edge.source().index()) {
                out.push(edge_idx);
            }
            if let Some(inc) = self.incoming.get_mut(edge.target().index()) {
                inc.push(edge_idx);
            }
        }

        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| ((node.address(), node.call_string().clone()), NodeId::new(idx)))
            .collect();

        self.by_address.clear();
        for (idx, node) in self.nodes.iter().enumerate() {
            self.by_address
                .entry(node.address())
                .or_default()
                .push(NodeId::new(idx));
        }
        for variants in self.by_address.values_mut() {
            variants.sort_by(|a, b| {
                self.nodes[a.index()]
                    .call_string()
                    .cmp(self.nodes[b.index()].call_string())
            });
        }
    }

    /// Returns the node data for the given ID.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&CfgNode> {
        self.nodes.get(id.index())
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the graph contains no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes with their IDs, in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &CfgNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (NodeId::new(idx), node))
    }

    /// Returns all edges, in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[CfgEdge] {
        &self.edges
    }

    /// Looks up the node for an exact `(address, call-string)` identity.
    #[must_use]
    pub fn node_at(&self, address: Address, call_string: &CallString) -> Option<NodeId> {
        self.index.get(&(address, call_string.clone())).copied()
    }

    /// Returns one node for the address, if any was reached.
    ///
    /// When multiple context variants exist, the one with the
    /// lexicographically smallest call-string is returned, so the choice is
    /// deterministic.
    #[must_use]
    pub fn any_node(&self, address: Address) -> Option<NodeId> {
        self.by_address
            .get(&address)
            .and_then(|variants| variants.first().copied())
    }

    /// Returns every context variant reached for the address.
    ///
    /// The slice is sorted by call-string; it is empty if the address was
    /// never reached.
    #[must_use]
    pub fn all_nodes(&self, address: Address) -> &[NodeId] {
        self.by_address
            .get(&address)
            .map_or(&[], Vec::as_slice)
    }

    /// Iterates over the direct predecessors of a node.
    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming
            .get(id.index())
            .into_iter()
            .flatten()
            .map(|&edge_idx| self.edges[edge_idx].source())
    }

    /// Iterates over the direct successors of a node.
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing
            .get(id.index())
            .into_iter()
            .flatten()
            .map(|&edge_idx| self.edges[edge_idx].target())
    }

    /// Iterates over the direct successors of a node with the jump kind of
    /// the connecting edge.
    pub fn successors_with_jumpkind(
        &self,
        id: NodeId,
    ) -> impl Iterator<Item = (NodeId, JumpKind)> + '_ {
        self.outgoing
            .get(id.index())
            .into_iter()
            .flatten()
            .map(|&edge_idx| {
                let edge = &self.edges[edge_idx];
                (edge.target(), edge.jump_kind())
            })
    }

    /// Iterates over all leaf nodes with the reason they stopped.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, LeafReason)> + '_ {
        self.nodes().filter_map(|(id, node)| {
            node.leaf().map(|reason| (id, reason))
        })
    }

    /// The entry addresses this graph was built from.
    #[must_use]
    pub fn entries(&self) -> &[Address] {
        &self.entries
    }

    /// The addresses that were never expanded.
    #[must_use]
    pub fn avoid(&self) -> &BTreeSet<Address> {
        &self.avoid
    }

    /// The call-string length bound the build used.
    #[must_use]
    pub fn context_sensitivity(&self) -> usize {
        self.context_sensitivity
    }

    /// The call-depth bound the build used, if any.
    #[must_use]
    pub fn call_depth(&self) -> Option<u32> {
        self.call_depth
    }

    /// Whether input-state snapshots were retained on nodes.
    ///
    /// Retained states exist only in the process that ran the build; a
    /// reloaded graph reports the flag but carries no states.
    #[must_use]
    pub fn keep_input_state(&self) -> bool {
        self.keep_input_state
    }
}

impl From<GraphData> for ControlFlowGraph {
    fn from(data: GraphData) -> Self {
        ControlFlowGraph::freeze(
            data.nodes,
            data.edges,
            data.entries,
            data.avoid,
            data.context_sensitivity,
            data.call_depth,
            data.keep_input_state,
        )
    }
}

impl From<ControlFlowGraph> for GraphData {
    fn from(graph: ControlFlowGraph) -> Self {
        GraphData {
            nodes: graph.nodes,
            edges: graph.edges,
            entries: graph.entries,
            avoid: graph.avoid,
            context_sensitivity: graph.context_sensitivity,
            call_depth: graph.call_depth,
            keep_input_state: graph.keep_input_state,
        }
    }
}
