use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default number of attempts (including the first).
pub const DEFAULT_TRIES: u32 = 3;
/// Default base delay for the backoff.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// How the delay grows between attempts.
///
/// With `n` the number of failed attempts so far (1-based) and `base` the
/// configured delay:
///
/// ```text
/// constant:    base          => 3, 3,  3,  3, ...
/// linear:      base * n      => 3, 6,  9, 12, ...
/// exponential: base * 2^(n-1) => 3, 6, 12, 24, ...
/// power:       base^n        => 3, 9, 27, 81, ...  (base must be >= 1s)
/// ```
///
/// Earlier wmflib releases named `power` and `exponential` the other way round: their
/// `exponential` was `base^n` and their `power` was `base * 2^(n-1)`. Settings
/// carried over from them must swap `power` and `exponential` to keep their delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffMode {
    Constant,
    Linear,
    #[default]
    Exponential,
    Power,
}

impl BackoffMode {
    /// Delay to sleep after the `failed`-th failed attempt. Saturates instead of overflowing.
    pub fn delay_for(self, base: Duration, failed: u32) -> Duration {
        let failed = failed.max(1);
        match self {
            BackoffMode::Constant => base,
            BackoffMode::Linear => base.saturating_mul(failed),
            BackoffMode::Exponential => {
                let factor = 1u32.checked_shl(failed - 1).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
            BackoffMode::Power => {
                let secs = base.as_secs_f64().powi(failed.min(i32::MAX as u32) as i32);
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
            }
        }
    }
}

impl fmt::Display for BackoffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackoffMode::Constant => "constant",
            BackoffMode::Linear => "linear",
            BackoffMode::Exponential => "exponential",
            BackoffMode::Power => "power",
        };
        f.write_str(name)
    }
}

/// Rejected retry parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid retry parameters: {0}")]
pub struct InvalidParams(pub String);

/// The mutable part of a policy, copied for every invocation and handed to
/// the dynamic callbacks between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryParams {
    pub tries: u32,
    pub delay: Duration,
    pub backoff_mode: BackoffMode,
    pub max_delay: Option<Duration>,
    pub failure_message: String,
}

impl RetryParams {
    /// Checks the consistency of the current values.
    pub fn validate(&self) -> Result<(), InvalidParams> {
        if self.tries < 1 {
            return Err(InvalidParams(format!(
                "tries must be a positive integer, got {}",
                self.tries
            )));
        }
        if self.backoff_mode == BackoffMode::Power && self.delay < Duration::from_secs(1) {
            return Err(InvalidParams(format!(
                "delay must be at least 1s if backoff_mode is power, got {:?}",
                self.delay
            )));
        }
        if self.failure_message.is_empty() {
            return Err(InvalidParams("a failure_message must be set".to_string()));
        }
        Ok(())
    }

    /// Delay after the `failed`-th failed attempt, capped by `max_delay`.
    pub fn backoff(&self, failed: u32) -> Duration {
        let delay = self.backoff_mode.delay_for(self.delay, failed);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

/// A failed attempt, as seen by the dynamic callbacks.
#[derive(Debug)]
pub struct Attempt<'a, E> {
    /// 1-based attempt number.
    pub index: u32,
    /// Delay slept before this attempt (zero for the first one).
    pub delay_taken: Duration,
    pub error: &'a E,
}

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
type Callback<E> = Arc<dyn Fn(&Attempt<'_, E>, RetryParams) -> RetryParams + Send + Sync>;

/// Retry policy for operations failing with `E`.
///
/// The policy itself is never mutated while retrying: every invocation copies
/// its parameters, so one policy can be shared between calls and threads.
pub struct RetryPolicy<E> {
    tries: u32,
    delay: Duration,
    backoff_mode: BackoffMode,
    max_delay: Option<Duration>,
    failure_message: Option<String>,
    retryable: Predicate<E>,
    callbacks: Vec<Callback<E>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            tries: self.tries,
            delay: self.delay,
            backoff_mode: self.backoff_mode,
            max_delay: self.max_delay,
            failure_message: self.failure_message.clone(),
            retryable: Arc::clone(&self.retryable),
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("tries", &self.tries)
            .field("delay", &self.delay)
            .field("backoff_mode", &self.backoff_mode)
            .field("max_delay", &self.max_delay)
            .field("failure_message", &self.failure_message)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl<E> RetryPolicy<E> {
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new()
    }

    pub fn tries(&self) -> u32 {
        self.tries
    }

    pub fn is_retryable(&self, error: &E) -> bool {
        (self.retryable)(error)
    }

    /// Fresh parameters for one invocation. `default_message` is used when no
    /// failure message was configured.
    pub fn params(&self, default_message: impl FnOnce() -> String) -> RetryParams {
        RetryParams {
            tries: self.tries,
            delay: self.delay,
            backoff_mode: self.backoff_mode,
            max_delay: self.max_delay,
            failure_message: self
                .failure_message
                .clone()
                .unwrap_or_else(default_message),
        }
    }

    /// Runs every dynamic callback in order, threading the parameters through.
    ///
    /// A callback returning an empty `failure_message` keeps the previous one.
    pub fn apply_callbacks(&self, attempt: &Attempt<'_, E>, params: RetryParams) -> RetryParams {
        self.callbacks.iter().fold(params, |params, callback| {
            let previous = params.failure_message.clone();
            let mut next = callback(attempt, params);
            if next.failure_message.is_empty() {
                tracing::debug!("ignoring empty failure message returned by a retry callback");
                next.failure_message = previous;
            }
            next
        })
    }
}

/// Builder for [`RetryPolicy`]. By default every error is retryable.
pub struct RetryPolicyBuilder<E> {
    policy: RetryPolicy<E>,
}

impl<E> RetryPolicyBuilder<E> {
    fn new() -> Self {
        Self {
            policy: RetryPolicy {
                tries: DEFAULT_TRIES,
                delay: DEFAULT_DELAY,
                backoff_mode: BackoffMode::default(),
                max_delay: None,
                failure_message: None,
                retryable: Arc::new(|_| true),
                callbacks: Vec::new(),
            },
        }
    }

    /// Maximum number of attempts, the first call included.
    pub fn tries(mut self, tries: u32) -> Self {
        self.policy.tries = tries;
        self
    }

    /// Base delay of the backoff.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.policy.delay = delay;
        self
    }

    pub fn backoff_mode(mut self, mode: BackoffMode) -> Self {
        self.policy.backoff_mode = mode;
        self
    }

    /// Upper bound applied to every computed delay.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.policy.max_delay = Some(max_delay);
        self
    }

    /// Message logged with each retryable failure.
    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.policy.failure_message = Some(message.into());
        self
    }

    /// Only errors matching `predicate` are retried; anything else is returned at once.
    pub fn retry_on<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.policy.retryable = Arc::new(predicate);
        self
    }

    /// Appends a callback run after each retryable failure. It gets the failed
    /// attempt and the current parameters and returns the parameters to use next.
    pub fn dynamic_params_callback<C>(mut self, callback: C) -> Self
    where
        C: Fn(&Attempt<'_, E>, RetryParams) -> RetryParams + Send + Sync + 'static,
    {
        self.policy.callbacks.push(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<RetryPolicy<E>, InvalidParams> {
        // Validate with a placeholder message; the real default is only known per call.
        self.policy
            .params(|| "<operation>".to_string())
            .validate()?;
        Ok(self.policy)
    }
}
