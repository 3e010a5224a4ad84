//! Retry and backoff.
//!
//! Runs an operation until it succeeds, fails with an error the policy does
//! not consider retryable, or runs out of attempts. Used directly by callers
//! and internally by the HTTP session and the file-locking helper.

mod chain;
mod policy;
mod run;

pub use chain::error_chain;
pub use policy::{
    Attempt, BackoffMode, InvalidParams, RetryParams, RetryPolicy, RetryPolicyBuilder,
    DEFAULT_DELAY, DEFAULT_TRIES,
};
pub use run::{retry, retry_with_sleeper};
