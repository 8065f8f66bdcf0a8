//! Per-project lazy memoization of analysis instances.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    analysis::{Analysis, AnalysisConfig, AnalysisRegistry},
    project::Project,
    Error, Result,
};

/// Lazily constructed, memoized analysis instances for one project.
///
/// The first request for a name looks up its constructor in the
/// [`AnalysisRegistry`], builds the instance with the supplied configuration,
/// and memoizes it. Every later request returns the memoized instance
/// unchanged — including requests that carry a different configuration:
/// configuration is honored on first construction only. An instance is
/// replaced only through an explicit [`discard`](Self::discard) followed by
/// a new request.
///
/// At most one live instance exists per (project, name) pair.
#[derive(Default)]
pub struct AnalysisCache {
    instances: DashMap<String, Arc<dyn Analysis>>,
}

impl AnalysisCache {
    /// Creates a new empty cache.
    #[must_use]
    pub(crate) fn new() -> Self {
        AnalysisCache {
            instances: DashMap::new(),
        }
    }

    /// Returns the analysis registered under `name`, constructing it with
    /// default options on first access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AnalysisNotFound`] if no constructor is registered
    /// under `name`, or the constructor's error if first-time construction
    /// fails.
    pub fn get(&self, project: &Project, name: &str) -> Result<Arc<dyn Analysis>> {
        self.get_with(project, name, AnalysisConfig::default())
    }

    /// Returns the analysis registered under `name`, constructing it with
    /// `config` on first access.
    ///
    /// If an instance is already memoized, `config` is ignored and the
    /// existing instance is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AnalysisNotFound`] if no constructor is registered
    /// under `name`, or the constructor's error if first-time construction
    /// fails.
    pub fn get_with(
        &self,
        project: &Project,
        name: &str,
        config: AnalysisConfig,
    ) -> Result<Arc<dyn Analysis>> {
        if let Some(existing) = self.instances.get(name) {
            return Ok(existing.clone());
        }

        let constructor = AnalysisRegistry::global()
            .lookup(name)
            .ok_or_else(|| Error::AnalysisNotFound(name.to_string()))?;

        // Construction runs outside the map lock so a constructor may
        // request sibling analyses from this same cache. If two threads
        // race, the first memoization wins and the loser's instance is
        // dropped.
        let instance = constructor(project, config)?;
        let entry = self.instances.entry(name.to_string()).or_insert(instance);
        Ok(entry.clone())
    }

    /// Returns the memoized instance for `name` without constructing.
    #[must_use]
    pub fn peek(&self, name: &str) -> Option<Arc<dyn Analysis>> {
        self.instances.get(name).map(|entry| entry.clone())
    }

    /// Returns `true` if an instance for `name` has been constructed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// Discards the memoized instance for `name`, if any.
    ///
    /// The next request for the name re-runs its constructor. Returns
    /// `true` if an instance was discarded.
    pub fn discard(&self, name: &str) -> bool {
        self.instances.remove(name).is_some()
    }

    /// Returns the number of constructed analyses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if no analyses have been constructed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl std::fmt::Debug for AnalysisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .instances
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        f.debug_struct("AnalysisCache")
            .field("constructed", &names)
            .finish()
    }
}
