//! Retry policy applied to backend calls made by reconcilers.
//!
//! Reads are retried directly. Writes are issued once; a write that failed
//! transiently is only re-issued after a read shows it did not land.

use crate::backend::Backend;
use crate::error::Result;
use crate::retry::with_retry;
use crate::types::RetryConfig;
use reconcile::OperationContext;
use std::sync::Arc;

/// A backend together with the retry policy reconcilers use against it.
#[derive(Clone)]
pub(crate) struct Remote {
    backend: Arc<dyn Backend>,
    retry: RetryConfig,
}

impl Remote {
    pub(crate) fn new(backend: Arc<dyn Backend>, retry: RetryConfig) -> Self {
        Self { backend, retry }
    }

    /// Idempotent call; retried on transient failure.
    pub(crate) fn read<T, F>(&self, ctx: &OperationContext, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut(&dyn Backend) -> Result<T>,
    {
        with_retry(&self.retry, ctx, what, || {
            log::debug!("{what}");
            op(self.backend.as_ref())
        })
    }

    /// Non-idempotent call; issued exactly once.
    pub(crate) fn write<T, F>(&self, ctx: &OperationContext, what: &str, op: F) -> Result<T>
    where
        F: FnOnce(&dyn Backend) -> Result<T>,
    {
        ctx.check()?;
        log::debug!("{what}");
        op(self.backend.as_ref())
    }

    /// Write whose effect can be observed.
    ///
    /// After a transient failure, `landed` is consulted (with read retries):
    /// `Some` means the write took effect and is returned as success, `None`
    /// means it did not and the write is issued again.
    pub(crate) fn write_verified<T, F, V>(
        &self,
        ctx: &OperationContext,
        what: &str,
        mut op: F,
        mut landed: V,
    ) -> Result<T>
    where
        F: FnMut(&dyn Backend) -> Result<T>,
        V: FnMut(&dyn Backend) -> Result<Option<T>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            ctx.check()?;
            log::debug!("{what}");
            let err = match op(self.backend.as_ref()) {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if !err.is_retryable() || attempt + 1 >= max_attempts {
                return Err(err);
            }

            let delay = self.retry.delay_for_attempt(attempt);
            log::warn!(
                "{what}: attempt {}/{} failed: {err}. Checking whether it landed",
                attempt + 1,
                max_attempts
            );
            ctx.sleep(delay)?;

            if let Some(value) = self.read(ctx, what, &mut landed)? {
                log::info!("{what}: change already in place");
                return Ok(value);
            }
            attempt += 1;
        }
    }
}
