//! Process-wide mapping from analysis names to constructors.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::{
    analysis::{builtin, Analysis, AnalysisConfig},
    project::Project,
    Result,
};

/// The constructor signature every registered analysis provides.
///
/// A constructor receives the owning [`Project`] (for default entry points,
/// the default initial state, and access to sibling analyses) and the
/// request's [`AnalysisConfig`]. Constructing with the default config must
/// always succeed for built-in analyses.
pub type AnalysisConstructor =
    Arc<dyn Fn(&Project, AnalysisConfig) -> Result<Arc<dyn Analysis>> + Send + Sync>;

/// Name-to-constructor registry for analyses.
///
/// The process-wide instance returned by [`AnalysisRegistry::global`] comes
/// pre-populated with the built-in analyses (CFG, VFG, DDG) and can be
/// extended at runtime; entries are never removed, and re-registering a name
/// silently replaces the previous constructor (last registration wins).
///
/// Standalone registries created with [`AnalysisRegistry::new`] start empty;
/// they are useful for embedding and for tests that must not touch global
/// state.
///
/// # Examples
///
/// ```rust
/// use binflow::AnalysisRegistry;
///
/// let registry = AnalysisRegistry::global();
/// assert!(registry.contains("CFG"));
/// assert!(registry.contains("VFG"));
/// assert!(registry.contains("DDG"));
/// ```
#[derive(Default)]
pub struct AnalysisRegistry {
    constructors: DashMap<String, AnalysisConstructor>,
}

impl AnalysisRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        AnalysisRegistry {
            constructors: DashMap::new(),
        }
    }

    /// Returns the process-wide registry, with built-ins pre-registered.
    ///
    /// The built-ins are installed before the registry becomes observable,
    /// so no user registration can race ahead of them.
    pub fn global() -> &'static AnalysisRegistry {
        static REGISTRY: OnceLock<AnalysisRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let registry = AnalysisRegistry::new();
            builtin::register_builtins(&registry);
            registry
        })
    }

    /// Registers a constructor under `name`.
    ///
    /// An existing registration for the same name is silently replaced.
    pub fn register(&self, name: &str, constructor: AnalysisConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    /// Looks up the constructor registered under `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<AnalysisConstructor> {
        self.constructors.get(name).map(|entry| entry.clone())
    }

    /// Returns `true` if a constructor is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Returns the names of all registered analyses.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.constructors
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Returns the number of registered analyses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns `true` if no analyses are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl std::fmt::Debug for AnalysisRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisRegistry")
            .field("names", &self.names())
            .finish()
    }
}
