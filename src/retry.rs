use std::{fmt, future::Future, time::Duration};

/// Bounded retry with a constant pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    /// Total number of attempts, including the first one. Zero is treated as
    /// one.
    pub attempts: u32,
    /// Pause between two attempts. No pause follows the last attempt.
    pub delay: Duration,
}

#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Run `op` until it succeeds or the attempts run out.
///
/// `op` receives the 1-based attempt number.
pub async fn with_fixed_backoff<F, Fut, T, E>(
    policy: FixedBackoff,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                tracing::warn!(attempt, attempts, error = %err, "giving up");
                return Err(RetryExhausted {
                    attempts,
                    last_error: err,
                });
            }
            Err(err) => {
                tracing::warn!(
                    attempt,
                    attempts,
                    error = %err,
                    delay_ms = policy.delay.as_millis() as u64,
                    "attempt failed, retrying"
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
        }
    }
}
