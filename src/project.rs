//! The project: a loaded program plus its per-project analysis cache.

use std::sync::Arc;

use crate::{
    analysis::{Analysis, AnalysisCache, AnalysisConfig, CFG},
    cfg::{CfgAnalysis, CfgOptions},
    lift::{Address, BlockLifter, MachineState},
    Error, Result,
};

/// A program under analysis.
///
/// A project bundles the [`BlockLifter`] that decodes the program, default
/// entry points and initial machine state for analyses that need them, and
/// the [`AnalysisCache`] that memoizes every analysis built over it.
///
/// # Usage
///
/// ```rust,ignore
/// use binflow::prelude::*;
///
/// let project = Project::new(Arc::new(lifter))
///     .with_entry_points([Address::new(0x1000)]);
///
/// // By-name access through the cache:
/// let analysis = project.analysis("CFG")?;
///
/// // Typed access:
/// let cfg = project.cfg()?;
/// assert!(cfg.graph().node_count() > 0);
/// ```
pub struct Project {
    lifter: Arc<dyn BlockLifter>,
    entry_points: Vec<Address>,
    initial_state: MachineState,
    analyses: AnalysisCache,
}

impl Project {
    /// Creates a project over the given lifter, with no entry points and an
    /// empty initial state.
    #[must_use]
    pub fn new(lifter: Arc<dyn BlockLifter>) -> Self {
        Project {
            lifter,
            entry_points: Vec::new(),
            initial_state: MachineState::empty(),
            analyses: AnalysisCache::new(),
        }
    }

    /// Sets the default entry points analyses start from.
    #[must_use]
    pub fn with_entry_points(mut self, entry_points: impl IntoIterator<Item = Address>) -> Self {
        self.entry_points = entry_points.into_iter().collect();
        self
    }

    /// Sets the default machine state analyses start with.
    #[must_use]
    pub fn with_initial_state(mut self, state: MachineState) -> Self {
        self.initial_state = state;
        self
    }

    /// The lifter decoding this program.
    #[must_use]
    pub fn lifter(&self) -> &dyn BlockLifter {
        self.lifter.as_ref()
    }

    /// The default entry points.
    #[must_use]
    pub fn entry_points(&self) -> &[Address] {
        &self.entry_points
    }

    /// The default initial machine state.
    #[must_use]
    pub fn initial_state(&self) -> &MachineState {
        &self.initial_state
    }

    /// This project's analysis cache.
    #[must_use]
    pub fn analyses(&self) -> &AnalysisCache {
        &self.analyses
    }

    /// Returns the analysis registered under `name`, constructing it with
    /// defaults on first access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AnalysisNotFound`] for an unregistered name, or the
    /// constructor's error on first-time construction.
    pub fn analysis(&self, name: &str) -> Result<Arc<dyn Analysis>> {
        self.analyses.get(self, name)
    }

    /// Returns the analysis registered under `name`, constructing it with
    /// `config` on first access.
    ///
    /// An already-memoized instance is returned unchanged; `config` only
    /// matters for the construction itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AnalysisNotFound`] for an unregistered name, or the
    /// constructor's error on first-time construction.
    pub fn analysis_with(&self, name: &str, config: AnalysisConfig) -> Result<Arc<dyn Analysis>> {
        self.analyses.get_with(self, name, config)
    }

    /// Returns the project's control flow graph, building it with default
    /// options on first access.
    ///
    /// # Errors
    ///
    /// Propagates construction failures, and returns
    /// [`Error::AnalysisType`] if the `"CFG"` registration was replaced
    /// with a constructor producing a different type.
    pub fn cfg(&self) -> Result<Arc<CfgAnalysis>> {
        self.cfg_from(AnalysisConfig::default())
    }

    /// Returns the project's control flow graph, building it with `options`
    /// on first access.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`cfg`](Self::cfg).
    pub fn cfg_with(&self, options: CfgOptions) -> Result<Arc<CfgAnalysis>> {
        self.cfg_from(AnalysisConfig::new().with_options(options))
    }

    fn cfg_from(&self, config: AnalysisConfig) -> Result<Arc<CfgAnalysis>> {
        let analysis = self.analyses.get_with(self, CFG, config)?;
        analysis
            .as_any_arc()
            .downcast::<CfgAnalysis>()
            .map_err(|_| Error::AnalysisType {
                name: CFG.to_string(),
                expected: "CfgAnalysis",
            })
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("entry_points", &self.entry_points)
            .field("analyses", &self.analyses)
            .finish_non_exhaustive()
    }
}
