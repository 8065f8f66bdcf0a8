// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # binflow
//!
//! A context-sensitive control flow graph recovery engine for binary
//! programs, built in pure Rust. `binflow` explores a program by forced
//! execution — lifting one basic block at a time and following every
//! reported successor — and produces a queryable graph whose nodes are
//! `(address, calling-context)` pairs, so code shared between call sites
//! is kept apart per caller instead of being merged.
//!
//! ## Features
//!
//! - **Context sensitivity** - bounded call-string contexts with a
//!   configurable length, from context-free (`0`) upwards
//! - **Bounded exploration** - call-depth limits and avoid-lists keep
//!   recoveries focused; every cut is labeled with why it stopped
//! - **Resilient by default** - a failing block lift is recorded and
//!   explored around, never silently dropped; fail-fast is one flag away
//! - **Pluggable lifters** - the engine is generic over a [`lift::BlockLifter`],
//!   so any decoder that can enumerate block successors plugs in
//! - **Analysis framework** - a process-wide registry plus per-project
//!   caching gives every analysis build-once semantics
//! - **Persistence** - recovered graphs serialize to JSON and reload with
//!   all indices rebuilt
//!
//! ## Quick Start
//!
//! Add `binflow` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! binflow = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust,ignore
//! use binflow::prelude::*;
//!
//! let project = Project::new(lifter).with_entry_points([Address::new(0x1000)]);
//! let cfg = project.cfg()?;
//! println!("recovered {} nodes", cfg.graph().node_count());
//! # Ok::<(), binflow::Error>(())
//! ```
//!
//! ### Direct Recovery
//!
//! ```rust,ignore
//! use binflow::cfg::{CfgAnalysis, CfgOptions};
//! use binflow::lift::Address;
//!
//! let analysis = CfgAnalysis::new(
//!     &lifter,
//!     CfgOptions::new()
//!         .with_start(Address::new(0x1000))
//!         .with_context_sensitivity(2)
//!         .with_call_depth(8),
//! )?;
//!
//! for (id, reason) in analysis.graph().leaves() {
//!     println!("{} stopped: {:?}", analysis.graph().node(id).unwrap(), reason);
//! }
//! # Ok::<(), binflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`lift`] - the decoder boundary: addresses, jump kinds, machine
//!   states, and the [`lift::BlockLifter`] trait
//! - [`cfg`] - call-string contexts, the worklist builder, and the frozen
//!   [`cfg::ControlFlowGraph`]
//! - [`analysis`] - the registry, per-project cache, and resilience
//!   machinery every analysis runs inside
//! - [`project`] - ties a lifter, defaults, and the cache together

mod error;

/// The generic analysis framework: registry, cache, and resilience.
///
/// # Key Components
///
/// - [`analysis::AnalysisRegistry`] - process-wide name-to-constructor
///   mapping, pre-populated with the built-ins
/// - [`analysis::AnalysisCache`] - per-project build-once memoization
/// - [`analysis::Resilience`] and [`analysis::ErrorLog`] - scoped error
///   capture for resilient analyses
pub mod analysis;

/// Context-sensitive control flow graph recovery.
///
/// # Key Components
///
/// - [`cfg::CallString`] - bounded caller history giving nodes context
/// - [`cfg::CfgBuilder`] and [`cfg::CfgOptions`] - the worklist and its
///   configuration
/// - [`cfg::ControlFlowGraph`] - the frozen, queryable result
/// - [`cfg::CfgAnalysis`] - the recovery packaged as a cacheable analysis
pub mod cfg;

/// The decoder boundary the engine is generic over.
///
/// # Key Components
///
/// - [`lift::BlockLifter`] - lifts one basic block into its successors
/// - [`lift::Address`], [`lift::JumpKind`] - program points and transfer
///   classifications
/// - [`lift::MachineState`] - opaque per-path state threaded through the
///   exploration
pub mod lift;

/// Commonly used types, importable in one line.
pub mod prelude;

/// The program under analysis and its analysis cache.
pub mod project;


/// `binflow` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type
/// is always [`Error`]. Used consistently throughout the crate for all
/// fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `binflow` Error type
///
/// The main error type for all operations in this crate: block lift
/// failures, registry misses, configuration problems, cancellation, and
/// serialization faults.
pub use error::Error;

/// Process-wide analysis registration.
///
/// See [`analysis::AnalysisRegistry`] for registering custom analyses
/// alongside the built-ins.
pub use analysis::AnalysisRegistry;

/// Scoped error capture for resilient analyses.
///
/// See [`analysis::Resilience`] for the capture policy and
/// [`analysis::ErrorLog`] for the journal it fills.
pub use analysis::{ErrorLog, Resilience};

/// The lifter boundary the engine is generic over.
///
/// See [`lift::BlockLifter`] for plugging in a decoder.
pub use lift::{Address, BlockLifter, BlockSuccessor, JumpKind, MachineState};

/// Bounded caller history giving CFG nodes their calling context.
///
/// See [`cfg::CallString`] for the transition rules.
pub use cfg::CallString;

/// Main entry point for analyzing a program.
///
/// See [`project::Project`] for loading a lifter and requesting analyses.
pub use project::Project;
