use strum::IntoStaticStr;
use thiserror::Error;

use crate::lift::Address;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all failure modes of CFG recovery and the surrounding analysis
/// framework. Each variant provides specific context about the failure to enable
/// appropriate handling by callers.
///
/// # Error Categories
///
/// ## Recovery Errors
/// - [`Error::Lift`] - The block lifter failed for a specific address
/// - [`Error::Cancelled`] - A build was aborted through its cancellation token
///
/// ## Framework Errors
/// - [`Error::AnalysisNotFound`] - Requested analysis name is not registered
/// - [`Error::AnalysisType`] - A cached analysis was accessed as the wrong concrete type
/// - [`Error::Configuration`] - Invalid analysis or project configuration
///
/// ## Infrastructure Errors
/// - [`Error::LockError`] - Thread synchronization failure
/// - [`Error::Serialization`] - Serializing or reloading a persisted analysis failed
///
/// # Examples
///
/// ```rust,ignore
/// use binflow::{Error, Project};
///
/// match project.analysis("CFC") {
///     Ok(analysis) => println!("Got {}", analysis.name()),
///     Err(Error::AnalysisNotFound(name)) => eprintln!("No analysis named '{name}'"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug, IntoStaticStr)]
pub enum Error {
    /// The block lifter failed to produce successors for an address.
    ///
    /// Under resilient mode this error is captured into the owning analysis's
    /// error log and the affected node is marked as a failure leaf; under
    /// fail-fast mode it aborts the whole build.
    #[error("Failed to lift block at {address}: {message}")]
    Lift {
        /// Address of the block that could not be lifted
        address: Address,
        /// Description of the underlying lifter failure
        message: String,
    },

    /// The requested analysis name is not present in the registry.
    ///
    /// This is a configuration/programming error and always propagates;
    /// it is never captured by a resilience scope.
    #[error("No analysis named '{0}' is registered")]
    AnalysisNotFound(String),

    /// A cached analysis instance is not of the expected concrete type.
    ///
    /// Occurs when a typed accessor (such as a CFG accessor) is used for a
    /// name that was registered with a different constructor.
    #[error("Analysis '{name}' is not a {expected}")]
    AnalysisType {
        /// The registered analysis name that was requested
        name: String,
        /// The concrete type the caller expected
        expected: &'static str,
    },

    /// Invalid project or analysis configuration.
    #[error("{0}")]
    Configuration(String),

    /// A build was aborted through its cancellation token.
    ///
    /// A cancelled build never exposes a partially indexed graph; the
    /// caller receives this error instead of a result.
    #[error("Build was cancelled")]
    Cancelled,

    /// Failed to lock target.
    ///
    /// This error occurs when thread synchronization fails, typically
    /// when trying to acquire a mutex that is in an invalid state.
    #[error("Failed to lock target")]
    LockError,

    /// Serialization or deserialization of a persisted analysis failed.
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns a stable, human-readable tag for this error's kind.
    ///
    /// The tag is the variant name (e.g. `"Lift"`). Error records in an
    /// analysis's error log store this tag instead of the live error value,
    /// so the log stays serializable after the error itself is gone.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}
