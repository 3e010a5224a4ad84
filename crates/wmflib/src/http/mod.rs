//! Blocking HTTP session with a User-Agent, a default timeout and retries.
//!
//! Backed by libcurl. Idempotent requests are retried through the retry
//! executor on throttling, 5xx and transport failures; POST is retried only
//! when the connection could not be established at all.

mod classify;
mod response;
mod session;

pub use classify::{classify_curl_error, classify_http_status, FailureKind, RETRY_STATUSES};
pub use response::Response;
pub use session::{HttpSession, HttpSessionBuilder, DEFAULT_TIMEOUT};

use crate::retry::InvalidParams;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP transfer failed")]
    Curl(#[from] curl::Error),

    /// Server kept answering with a retryable status until the tries ran out.
    #[error("HTTP {0} after all retries")]
    RetryableStatus(u32),

    #[error("invalid URL")]
    Url(#[from] url::ParseError),

    #[error("invalid JSON in response body")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidParams(#[from] InvalidParams),
}

impl HttpError {
    /// Whether an idempotent request failing this way should be tried again.
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpError::Curl(e) => classify_curl_error(e).is_retryable(),
            HttpError::RetryableStatus(_) => true,
            _ => false,
        }
    }

    /// Whether the request never reached the server, which makes even a
    /// non-idempotent request safe to send again.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, HttpError::Curl(e) if classify_curl_error(e) == FailureKind::Connect)
    }
}
