//! Operation context: cancellation and deadlines
//!
//! Every reconciler operation receives an [`OperationContext`]. Remote calls
//! check it before they are issued, and any waiting (retry back-off, polling
//! of queued operations) goes through [`OperationContext::sleep`] so that a
//! cancelled or expired operation returns promptly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest single sleep between cancellation checks
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Why an operation stopped before completing
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,
    /// The caller-supplied deadline passed
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

/// Shared cancellation flag
///
/// Clones share the same flag, so a host can hand one clone to an operation
/// and cancel it from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every operation holding this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Context passed to every reconciler operation
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Point in time after which the operation must give up
    deadline: Option<Instant>,
    /// Cancellation flag shared with the host
    token: CancellationToken,
}

impl OperationContext {
    /// Create a context with no deadline and a fresh token
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Create a context that expires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            token: CancellationToken::new(),
        }
    }

    /// Use an existing cancellation token
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// The cancellation token observed by this context
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline (`None` when unbounded)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail if the operation was cancelled or its deadline passed
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.token.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }

    /// Sleep for `duration`, waking early on cancellation or deadline
    ///
    /// Returns an error instead of sleeping past the deadline.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let wake_at = Instant::now() + duration;
        if let Some(deadline) = self.deadline
            && wake_at > deadline
        {
            // Sleep out what is left so callers observe a consistent expiry
            self.sleep_until(deadline)?;
            return Err(Interrupted::DeadlineExceeded);
        }
        self.sleep_until(wake_at)
    }

    fn sleep_until(&self, wake_at: Instant) -> Result<(), Interrupted> {
        loop {
            if self.token.is_cancelled() {
                return Err(Interrupted::Cancelled);
            }
            let now = Instant::now();
            if now >= wake_at {
                return Ok(());
            }
            std::thread::sleep((wake_at - now).min(SLEEP_SLICE));
        }
    }
}
