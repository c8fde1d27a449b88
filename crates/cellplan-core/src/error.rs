use cellplan_sheets::RemoteError;
use thiserror::Error;

use crate::plan::TaskStatus;
use crate::store::PlanVersion;

/// Errors raised by plan store operations.
///
/// Domain errors are raised before any write. Remote errors come from the
/// access layer untouched, after its own retries.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no plan exists in the plan cell")]
    NoPlan,

    #[error("task {step} not found (available: {})", .available.join(", "))]
    TaskNotFound {
        step: String,
        available: Vec<String>,
    },

    #[error("invalid transition for task {step}: {from} -> {to}")]
    InvalidTransition {
        step: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("task {step} cannot become {status} without a reason or note")]
    MissingAnnotation { step: String, status: TaskStatus },

    #[error("plan changed since it was read (expected version {expected}, found {actual})")]
    StaleWrite {
        expected: PlanVersion,
        actual: PlanVersion,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl PlanError {
    /// A transient remote failure that outlasted the retry budget.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Self::Remote(err) if err.is_retryable())
    }

    /// A remote failure that is never retried (auth, permission, bad request).
    pub fn is_fatal_remote(&self) -> bool {
        matches!(self, Self::Remote(err) if !err.is_retryable())
    }
}
