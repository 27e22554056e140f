//! Error taxonomy for the scheduler.
//!
//! The worker loop never lets an error escape uncaught: every outcome maps to
//! one of `mark_success`, `mark_requeue`, `mark_failure`, or worker
//! termination (see [`crate::worker`]). Dispatcher-facing methods surface
//! structural errors synchronously; listener errors are swallowed at the
//! observer boundary instead of propagating here.

use thiserror::Error;

/// Errors the core can report to a caller.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `enqueue` was called against a queue name that does not exist and the
    /// caller chose the non-creating path.
    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    /// The default executor was asked to run a task payload that does not
    /// expose the runnable capability.
    #[error("task does not support execution: {0}")]
    UnsupportedTask(String),

    /// A stored payload or event blob could not be decoded back into a typed
    /// value. Recovered locally via a legacy placeholder; this variant exists
    /// so callers that bypass the placeholder machinery can still observe it.
    #[error("failed to decode stored payload: {0}")]
    DecodeFailure(String),

    /// The underlying store is unavailable or returned an I/O error.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] anyhow::Error),

    /// `retry_count` reached `retry_limit`; the task has been moved to the
    /// Failed state with this message as its failure reason.
    #[error("retry limit exceeded: {0}")]
    RetryLimitExceeded(String),

    /// A task or event id referenced a row that no longer exists. Most
    /// operations treat this as a benign no-op (see module docs); this
    /// variant is for the few callers that need to distinguish it.
    #[error("no such row: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Distinguishes failures a worker should retry from failures that should go
/// straight to the Failed state without consuming a retry attempt.
///
/// Mirrors the retryable/non-retryable split used by job-queue executors
/// generally: a network blip is worth retrying, a payload that can never
/// succeed (e.g. permanently invalid input) is not.
pub trait Categorizable {
    fn category(&self) -> FailureCategory;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Retryable,
    Terminal,
}

impl Categorizable for SchedulerError {
    fn category(&self) -> FailureCategory {
        match self {
            SchedulerError::StoreUnavailable(_) => FailureCategory::Retryable,
            _ => FailureCategory::Terminal,
        }
    }
}
