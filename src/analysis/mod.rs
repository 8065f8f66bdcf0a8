//! The generic analysis framework: registration, caching, and resilience.
//!
//! Every analysis — CFG recovery included — runs inside this framework. It
//! provides three pieces of shared machinery:
//!
//! - [`AnalysisRegistry`] - process-wide mapping from analysis name to
//!   constructor, pre-populated with the built-ins and extendable at runtime
//! - [`AnalysisCache`] - per-project lazy memoization: the first request for
//!   a name constructs the analysis, every later request is free
//! - [`Resilience`] / [`ErrorLog`] - scoped error capture so one failing
//!   sub-computation does not discard an analysis's partial successes
//!
//! # Architecture
//!
//! A client requests an analysis by name from a project's cache. The cache
//! either returns the memoized instance or looks the constructor up in the
//! registry, invokes it with the project reference and the request's
//! [`AnalysisConfig`], memoizes the result, and returns it. Constructors are
//! ordinary functions; no reflection is involved anywhere.
//!
//! # Usage
//!
//! ```rust,ignore
//! use binflow::prelude::*;
//!
//! let project = Project::new(lifter).with_entry_points([Address::new(0x1000)]);
//!
//! // First access builds the CFG with defaults, later accesses are free.
//! let cfg = project.cfg()?;
//! println!("{} nodes recovered", cfg.graph().node_count());
//! ```

mod builtin;
mod cache;
mod registry;
mod resilience;

use std::any::Any;

pub use builtin::{DdgAnalysis, VfgAnalysis};
pub use cache::AnalysisCache;
pub use registry::{AnalysisConstructor, AnalysisRegistry};
pub use resilience::{ErrorLog, ErrorRecord, Resilience};

/// Registered name of the built-in control flow graph analysis.
pub const CFG: &str = "CFG";
/// Registered name of the built-in value flow graph analysis.
pub const VFG: &str = "VFG";
/// Registered name of the built-in data dependency graph analysis.
pub const DDG: &str = "DDG";

/// Behavior shared by every analysis the framework can construct and cache.
///
/// Implementations own their [`ErrorLog`] and expose a downcast surface so
/// typed accessors can recover the concrete analysis from a cached
/// `Arc<dyn Analysis>`.
pub trait Analysis: Any + Send + Sync {
    /// The registered name this analysis was constructed under.
    fn name(&self) -> &str;

    /// The failure journal accumulated while this analysis ran.
    fn error_log(&self) -> &ErrorLog;

    /// Borrowed downcast surface.
    fn as_any(&self) -> &dyn Any;

    /// Owning downcast surface, for recovering a typed `Arc`.
    fn as_any_arc(self: std::sync::Arc<Self>) -> std::sync::Arc<dyn Any + Send + Sync>;
}

/// Configuration carried by an analysis construction request.
///
/// This is the explicit rendering of "free-form options plus the reserved
/// controls": `fail_fast` switches the analysis's resilience off, and
/// `options` carries the analysis-specific option struct as a type-erased
/// payload the constructor downcasts (the CFG constructor expects
/// [`CfgOptions`](crate::cfg::CfgOptions), a custom analysis expects its
/// own type). An absent or mismatched payload means defaults.
#[derive(Default)]
pub struct AnalysisConfig {
    /// Abort on the first failure instead of capturing it.
    pub fail_fast: bool,
    /// Analysis-specific options, downcast by the constructor.
    pub options: Option<Box<dyn Any + Send>>,
}

impl AnalysisConfig {
    /// Creates a default configuration (resilient, no options).
    #[must_use]
    pub fn new() -> Self {
        AnalysisConfig::default()
    }

    /// Sets the fail-fast flag.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Attaches an analysis-specific option payload.
    #[must_use]
    pub fn with_options<T: Any + Send>(mut self, options: T) -> Self {
        self.options = Some(Box::new(options));
        self
    }

    /// Extracts the option payload as a concrete type.
    ///
    /// Returns `None` when no payload was attached or the payload has a
    /// different type, in which case the constructor falls back to its
    /// defaults.
    #[must_use]
    pub fn options_into<T: Any>(self) -> Option<T> {
        self.options
            .and_then(|options| options.downcast::<T>().ok())
            .map(|options| *options)
    }
}

impl std::fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("fail_fast", &self.fail_fast)
            .field("has_options", &self.options.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_resilient_and_empty() {
        let config = AnalysisConfig::default();
        assert!(!config.fail_fast);
        assert!(config.options.is_none());
    }

    #[test]
    fn test_config_options_round_trip() {
        let config = AnalysisConfig::new()
            .with_fail_fast(true)
            .with_options(42u32);
        assert!(config.fail_fast);
        assert_eq!(config.options_into::<u32>(), Some(42));
    }

    #[test]
    fn test_config_mismatched_options_fall_back() {
        let config = AnalysisConfig::new().with_options("wrong type".to_string());
        assert_eq!(config.options_into::<u32>(), None);
    }
}
