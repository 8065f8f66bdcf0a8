//! # binflow Prelude
//!
//! This module provides a convenient prelude for the most commonly used
//! types and traits from the binflow library. Import this module to get
//! quick access to the essentials for control flow graph recovery.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all binflow operations
pub use crate::Error;

/// The result type used throughout binflow
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Main entry point for analyzing a program
pub use crate::project::Project;

/// Process-wide analysis registration
pub use crate::analysis::AnalysisRegistry;

// ================================================================================================
// Lifter Boundary
// ================================================================================================

/// The decoder trait the engine is generic over
pub use crate::lift::BlockLifter;

/// Addresses, transfer classifications, successors, and opaque states
pub use crate::lift::{Address, BlockSuccessor, JumpKind, MachineState};

// ================================================================================================
// Control Flow Graph Recovery
// ================================================================================================

/// The recovery packaged as a cacheable analysis
pub use crate::cfg::CfgAnalysis;

/// Build configuration and the frozen result
pub use crate::cfg::{CfgOptions, ControlFlowGraph};

/// Graph constituents and leaf classification
pub use crate::cfg::{CallString, CfgEdge, CfgNode, LeafReason, NodeId};

// ================================================================================================
// Analysis Framework
// ================================================================================================

/// Behavior shared by every analysis
pub use crate::analysis::Analysis;

/// Construction-time configuration for analyses
pub use crate::analysis::AnalysisConfig;

/// Scoped error capture for resilient analyses
pub use crate::analysis::{ErrorLog, ErrorRecord, Resilience};

/// Registered names of the built-in analyses
pub use crate::analysis::{CFG, DDG, VFG};
