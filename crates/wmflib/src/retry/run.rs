//! Retry loop: run a closure until success or the policy says stop.

use super::chain::error_chain;
use super::policy::{Attempt, RetryPolicy};
use std::error::Error;
use std::time::Duration;

/// Runs `op` until it succeeds or the retry policy says to stop, sleeping the
/// backoff delay between attempts on the current thread.
///
/// Returns the first success, the first non-retryable error, or the last
/// error once the attempts are exhausted. Intermediate failures are only logged.
pub fn retry<T, E, F>(policy: &RetryPolicy<E>, op: F) -> Result<T, E>
where
    E: Error + 'static,
    F: FnMut() -> Result<T, E>,
{
    retry_with_sleeper(policy, std::thread::sleep, op)
}

/// Like [`retry`], but every backoff goes through `sleep`.
pub fn retry_with_sleeper<T, E, F, S>(policy: &RetryPolicy<E>, mut sleep: S, mut op: F) -> Result<T, E>
where
    E: Error + 'static,
    F: FnMut() -> Result<T, E>,
    S: FnMut(Duration),
{
    let mut params =
        policy.params(|| format!("Attempt to run '{}' raised", std::any::type_name::<F>()));
    let mut index = 1u32;
    let mut delay_taken = Duration::ZERO;

    loop {
        let error = match op() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !policy.is_retryable(&error) {
            tracing::debug!(attempt = index, "non-retryable failure: {}", error);
            return Err(error);
        }

        let attempt = Attempt {
            index,
            delay_taken,
            error: &error,
        };
        params = policy.apply_callbacks(&attempt, params);

        if index >= params.tries {
            tracing::debug!(
                attempt = index,
                tries = params.tries,
                "giving up after {} attempts: {}",
                index,
                error
            );
            return Err(error);
        }

        let delay = params.backoff(index);
        tracing::warn!(
            attempt = index,
            tries = params.tries,
            delay_ms = delay.as_millis() as u64,
            "[{}/{}, retrying in {:.2}s] {}: {}",
            index,
            params.tries,
            delay.as_secs_f64(),
            params.failure_message,
            error_chain(&error)
        );
        sleep(delay);
        delay_taken = delay;
        index += 1;
    }
}
