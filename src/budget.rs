use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::TimelineError;

/// Run-level deadline plus a shared cancel flag. Checked between identifiers
/// and between resolution hops, never in the middle of a fetch.
#[derive(Debug, Clone, Default)]
pub struct RunBudget {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl RunBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map(Self::with_timeout).unwrap_or_default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_exhausted(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn check(&self) -> Result<(), TimelineError> {
        if self.is_exhausted() {
            return Err(TimelineError::Cancelled);
        }
        Ok(())
    }
}
