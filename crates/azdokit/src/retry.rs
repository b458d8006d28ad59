//! Retry logic with exponential backoff for transient errors.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use reconcile::OperationContext;

/// Execute an operation with retry logic.
///
/// Retries the operation while it returns a retryable error, using
/// exponential backoff between attempts. The context is checked before every
/// attempt, and back-off waits end early on cancellation or deadline.
///
/// # Arguments
/// * `config` - Retry configuration
/// * `ctx` - Operation context bounding the whole sequence
/// * `what` - Short description of the call, for logging
/// * `operation` - The operation to execute
///
/// # Returns
/// The result of the operation, or the last error if all attempts failed.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    ctx: &OperationContext,
    what: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        ctx.check()?;

        let err = match operation() {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        // If error is not retryable, or this was the last attempt, give up
        if !err.is_retryable() || attempt + 1 >= max_attempts {
            return Err(err);
        }

        let delay = config.delay_for_attempt(attempt);
        log::warn!(
            "{what}: attempt {}/{} failed: {err}. Retrying in {:.1}s",
            attempt + 1,
            max_attempts,
            delay.as_secs_f64()
        );
        ctx.sleep(delay).map_err(Error::from)?;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_with_retry_success_first_try() {
        let ctx = OperationContext::new();
        let result = with_retry(&RetryConfig::no_retry(), &ctx, "noop", || Ok::<_, Error>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_with_retry_non_retryable_error() {
        let ctx = OperationContext::new();
        let attempts = Cell::new(0);

        let result: Result<()> = with_retry(&fast_config(3), &ctx, "lookup", || {
            attempts.set(attempts.get() + 1);
            Err(Error::not_found("repository", "r1"))
        });

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_with_retry_eventual_success() {
        let ctx = OperationContext::new();
        let attempts = Cell::new(0);

        let result = with_retry(&fast_config(3), &ctx, "list refs", || {
            let current = attempts.get();
            attempts.set(current + 1);
            if current < 2 {
                Err(Error::api(503, "unavailable"))
            } else {
                Ok("done")
            }
        });

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_with_retry_exhausted() {
        let ctx = OperationContext::new();
        let attempts = Cell::new(0);

        let result: Result<()> = with_retry(&fast_config(2), &ctx, "list refs", || {
            attempts.set(attempts.get() + 1);
            Err(Error::network("connection reset"))
        });

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_with_retry_stops_when_cancelled() {
        let ctx = OperationContext::new();
        ctx.token().cancel();
        let attempts = Cell::new(0);

        let result: Result<()> = with_retry(&fast_config(3), &ctx, "list refs", || {
            attempts.set(attempts.get() + 1);
            Ok(())
        });

        assert!(matches!(
            result,
            Err(Error::Interrupted(reconcile::Interrupted::Cancelled))
        ));
        assert_eq!(attempts.get(), 0);
    }

    #[test]
    fn test_with_retry_respects_deadline_during_backoff() {
        let ctx = OperationContext::with_timeout(Duration::from_millis(20));
        let config = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_secs(5),
            backoff_factor: 1.0,
            max_delay: Duration::from_secs(5),
        };

        let result: Result<()> =
            with_retry(&config, &ctx, "list refs", || Err(Error::api(500, "boom")));

        assert!(matches!(
            result,
            Err(Error::Interrupted(reconcile::Interrupted::DeadlineExceeded))
        ));
    }
}
