//! Scoped error capture for partially failing analyses.
//!
//! An analysis typically iterates over many independent sub-computations
//! (one lift per block, one pass per function). A single localized failure
//! should not discard all the partial successes already obtained. This
//! module provides the capture discipline: each fallible sub-step runs
//! inside a [`Resilience`] scope which appends failures to the owning
//! analysis's [`ErrorLog`] and lets execution continue — unless fail-fast
//! mode is active, in which case the first failure aborts the whole run.
//!
//! # Examples
//!
//! ```rust
//! use binflow::{ErrorLog, Resilience, Error, Address};
//!
//! let log = ErrorLog::new();
//! let scope = Resilience::new(&log, false);
//!
//! let outcome: Option<u32> = scope
//!     .run(|| {
//!         Err(Error::Lift {
//!             address: Address::new(0x1000),
//!             message: "unmapped".to_string(),
//!         })
//!     })
//!     .unwrap();
//!
//! assert!(outcome.is_none());
//! assert_eq!(log.len(), 1);
//! ```

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A captured failure, reduced to its persistable core.
///
/// Records keep only the error's kind tag and rendered message. Anything
/// that cannot outlive the process — source errors, backtraces, borrowed
/// payloads — is discarded at capture time, so a log can be serialized
/// alongside the analysis that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Stable kind tag, the error's variant name (e.g. `"Lift"`).
    pub kind: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl From<&Error> for ErrorRecord {
    fn from(error: &Error) -> Self {
        ErrorRecord {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ErrorLogInner {
    records: Vec<ErrorRecord>,
    named: HashMap<String, ErrorRecord>,
}

/// The failure journal owned by a single analysis instance.
///
/// Holds the ordered sequence of captured errors plus a name-keyed mapping
/// for sub-computations that were given an identity (e.g. one entry per
/// failing address). The log is interior-mutable so a shared analysis can
/// keep recording during its construction, and it serializes with the
/// analysis it belongs to.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorLog {
    inner: Mutex<ErrorLogInner>,
}

impl ErrorLog {
    /// Creates a new empty error log.
    #[must_use]
    pub fn new() -> Self {
        ErrorLog::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ErrorLogInner> {
        // A poisoned log only means a panicking thread stopped mid-append;
        // the records themselves stay usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an unnamed record for the given error.
    pub fn record(&self, error: &Error) {
        self.lock().records.push(ErrorRecord::from(error));
    }

    /// Appends a record for the given error and also stores it under `name`.
    ///
    /// The record appears in both the ordered sequence and the named map;
    /// a later record with the same name replaces the named entry but not
    /// the ordered one.
    pub fn record_named(&self, name: &str, error: &Error) {
        let record = ErrorRecord::from(error);
        let mut inner = self.lock();
        inner.records.push(record.clone());
        inner.named.insert(name.to_string(), record);
    }

    /// Returns the number of captured records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Returns `true` if nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Returns a snapshot of the ordered record sequence.
    #[must_use]
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.lock().records.clone()
    }

    /// Returns the record stored under `name`, if any.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<ErrorRecord> {
        self.lock().named.get(name).cloned()
    }

    /// Returns a snapshot of the name-keyed record mapping.
    #[must_use]
    pub fn named_records(&self) -> HashMap<String, ErrorRecord> {
        self.lock().named.clone()
    }
}

/// A scoped error-capture policy bound to an [`ErrorLog`].
///
/// `run` and `run_named` execute a fallible closure under the policy:
///
/// - success passes through as `Ok(Some(value))`
/// - a matching failure in resilient mode is captured into the log and
///   swallowed as `Ok(None)`, so the caller continues with the next
///   sub-computation
/// - a matching failure under fail-fast is recorded and then propagated
///   as `Err`, aborting the enclosing run
/// - a failure the filter rejects propagates as `Err` without being
///   recorded, regardless of mode
///
/// The default filter captures every error kind; [`with_filter`](Self::with_filter)
/// narrows the scope to specific kinds, everything else propagating
/// regardless of mode.
#[derive(Clone, Copy)]
pub struct Resilience<'a> {
    log: &'a ErrorLog,
    fail_fast: bool,
    filter: fn(&Error) -> bool,
}

impl<'a> Resilience<'a> {
    /// Creates a capture scope over `log`, catching every error kind.
    #[must_use]
    pub fn new(log: &'a ErrorLog, fail_fast: bool) -> Self {
        Resilience {
            log,
            fail_fast,
            filter: |_| true,
        }
    }

    /// Restricts capture to errors accepted by `filter`.
    ///
    /// Rejected errors always propagate, even in resilient mode.
    #[must_use]
    pub fn with_filter(mut self, filter: fn(&Error) -> bool) -> Self {
        self.filter = filter;
        self
    }

    /// Returns `true` if the first failure aborts the enclosing run.
    #[must_use]
    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Runs a fallible sub-computation under this policy.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error under fail-fast mode or when the
    /// error does not match the capture filter.
    pub fn run<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<Option<T>> {
        self.dispatch(None, f)
    }

    /// Runs a named fallible sub-computation under this policy.
    ///
    /// Captured failures are additionally stored under `name` in the log's
    /// named mapping.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error under fail-fast mode or when the
    /// error does not match the capture filter.
    pub fn run_named<T>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<Option<T>> {
        self.dispatch(Some(name), f)
    }

    fn dispatch<T>(&self, name: Option<&str>, f: impl FnOnce() -> Result<T>) -> Result<Option<T>> {
        match f() {
            Ok(value) => Ok(Some(value)),
            Err(error) if (self.filter)(&error) => {
                match name {
                    Some(name) => self.log.record_named(name, &error),
                    None => self.log.record(&error),
                }
                if self.fail_fast {
                    Err(error)
                } else {
                    Ok(None)
                }
            }
            Err(error) => Err(error),
        }
    }
}

impl std::fmt::Debug for Resilience<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resilience")
            .field("fail_fast", &self.fail_fast)
            .finish_non_exhaustive()
    }
}
