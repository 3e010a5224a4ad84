//! Classify HTTP status and curl errors for retry decisions.

/// High-level classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Could not reach the server at all (DNS, refused connection).
    Connect,
    /// Connection broke mid-transfer.
    Transport,
    /// 5xx status worth another try.
    Http5xx(u16),
    /// Anything else (not retried).
    Other,
}

impl FailureKind {
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureKind::Other)
    }
}

/// Statuses that make an idempotent request go through the retry loop.
pub const RETRY_STATUSES: [u32; 5] = [429, 500, 502, 503, 504];

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> FailureKind {
    match code {
        429 | 503 => FailureKind::Throttled,
        500 | 502 | 504 => FailureKind::Http5xx(code as u16),
        _ => FailureKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> FailureKind {
    if e.is_operation_timedout() {
        return FailureKind::Timeout;
    }
    if e.is_couldnt_connect() || e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
        return FailureKind::Connect;
    }
    if e.is_read_error() || e.is_recv_error() || e.is_send_error() || e.is_got_nothing() {
        return FailureKind::Transport;
    }
    FailureKind::Other
}
