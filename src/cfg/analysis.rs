//! The control flow graph analysis as a framework citizen.

use std::{any::Any, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    analysis::{Analysis, AnalysisConfig, ErrorLog, CFG},
    cfg::{CfgBuilder, CfgOptions, ControlFlowGraph},
    lift::BlockLifter,
    project::Project,
    Result,
};

/// A completed control flow graph recovery: the frozen graph plus the
/// failure journal the build accumulated.
///
/// Instances normally come from a project's analysis cache (see
/// [`Project::cfg`]), which constructs them through the registry and
/// memoizes them. [`CfgAnalysis::new`] runs the same recovery standalone,
/// without a project.
///
/// The analysis serializes as a whole, graph and error journal together, so
/// a persisted recovery can be reloaded and re-queried without re-running
/// the build.
#[derive(Debug, Serialize, Deserialize)]
pub struct CfgAnalysis {
    graph: ControlFlowGraph,
    errors: ErrorLog,
}

impl CfgAnalysis {
    /// Recovers a control flow graph directly from a lifter, outside any
    /// project.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`](crate::Error::Cancelled) if a cancel
    /// token fires, or the first lift failure when fail-fast is set.
    pub fn new(lifter: &dyn BlockLifter, options: CfgOptions) -> Result<Self> {
        let errors = ErrorLog::new();
        let graph = CfgBuilder::new(lifter, options).build(&errors)?;
        Ok(CfgAnalysis { graph, errors })
    }

    /// The registry constructor behind the `"CFG"` name.
    ///
    /// Option resolution: the config's payload supplies [`CfgOptions`]
    /// (defaults when absent or mismatched), the config's `fail_fast` flag
    /// forces fail-fast on, and a payload without explicit starts or
    /// initial state inherits the project's entry points and state.
    pub(crate) fn construct(
        project: &Project,
        config: AnalysisConfig,
    ) -> Result<Arc<dyn Analysis>> {
        let fail_fast = config.fail_fast;
        let mut options = config.options_into::<CfgOptions>().unwrap_or_default();
        if fail_fast {
            options = options.with_fail_fast(true);
        }
        if !options.has_starts() {
            options = options.with_starts(project.entry_points().iter().copied());
        }
        if !options.has_initial_state() {
            options = options.with_initial_state(project.initial_state().clone());
        }

        let analysis = CfgAnalysis::new(project.lifter(), options)?;
        Ok(Arc::new(analysis))
    }

    /// The recovered graph.
    #[must_use]
    pub fn graph(&self) -> &ControlFlowGraph {
        &self.graph
    }

    /// Serializes the analysis, graph and error journal included, to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`](crate::Error::Serialization) if
    /// encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reloads a previously serialized analysis.
    ///
    /// The reloaded graph answers every structural query; retained machine
    /// states are not persisted and come back empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`](crate::Error::Serialization) if the
    /// input is not a valid serialized analysis.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Analysis for CfgAnalysis {
    fn name(&self) -> &str {
        CFG
    }

    fn error_log(&self) -> &ErrorLog {
        &self.errors
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
