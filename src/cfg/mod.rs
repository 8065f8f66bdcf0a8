//! Context-sensitive control flow graph recovery.
//!
//! This module builds a CFG for a binary program by forced execution: a
//! [`BlockLifter`](crate::lift::BlockLifter) turns addresses into block
//! successors, and a worklist follows every successor until no unexplored
//! `(address, call-string)` pair remains. The call-string — a bounded
//! history of caller addresses — keeps separate copies of code reached from
//! different call sites, so a shared helper gets one node per calling
//! context instead of a single merged node.
//!
//! # Key types
//!
//! - [`CallString`] - bounded caller history giving nodes their context
//! - [`CfgOptions`] / [`CfgBuilder`] - build configuration and the worklist
//! - [`ControlFlowGraph`] - the frozen, queryable result
//! - [`CfgAnalysis`] - the graph packaged as a cacheable analysis
//!
//! # Usage
//!
//! ```rust,ignore
//! use binflow::prelude::*;
//!
//! let analysis = CfgAnalysis::new(
//!     &lifter,
//!     CfgOptions::new()
//!         .with_start(Address::new(0x1000))
//!         .with_context_sensitivity(2),
//! )?;
//! let graph = analysis.graph();
//! for (id, reason) in graph.leaves() {
//!     println!("{} stopped: {:?}", graph.node(id).unwrap(), reason);
//! }
//! ```

mod analysis;
mod builder;
mod context;
mod edge;
mod graph;
mod node;

pub use analysis::CfgAnalysis;
pub use builder::{CfgBuilder, CfgOptions};
pub use context::CallString;
pub use edge::CfgEdge;
pub use graph::ControlFlowGraph;
pub use node::{CfgNode, LeafReason, NodeId};
