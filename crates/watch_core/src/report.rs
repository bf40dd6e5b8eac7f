use std::fmt;

use thiserror::Error;

/// What one completed cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub new_items: usize,
    pub notified: usize,
    pub delivery_failures: usize,
    pub retries_used: u32,
    pub persisted: bool,
}

/// Terminal error for one cycle. Logged by the loop, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleFailure {
    /// The upstream rejected the post reference; no retry was spent on it.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("retries exhausted after {attempts} fetch attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
    #[error("cycle deadline of {secs}s exceeded")]
    DeadlineExceeded { secs: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fetch and persistence succeeded. Individual deliveries may still have
    /// failed; see `delivery_failures`.
    Success(CycleReport),
    /// New items were notified but the known set could not be saved.
    Partial(CycleReport),
    Failed(CycleFailure),
}

impl CycleOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CycleOutcome::Failed(_))
    }

    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::Success(report) | CycleOutcome::Partial(report) => Some(report),
            CycleOutcome::Failed(_) => None,
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Success(r) => write!(
                f,
                "success (fetched {}, new {}, notified {}, delivery failures {})",
                r.fetched, r.new_items, r.notified, r.delivery_failures
            ),
            CycleOutcome::Partial(r) => write!(
                f,
                "partial (fetched {}, new {}, notified {}, not persisted)",
                r.fetched, r.new_items, r.notified
            ),
            CycleOutcome::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}
