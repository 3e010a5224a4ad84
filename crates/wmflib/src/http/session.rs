use super::classify::RETRY_STATUSES;
use super::{HttpError, Response};
use crate::retry::{retry, BackoffMode, RetryPolicy};
use std::time::Duration;
use url::Url;

/// Timeout applied to every request unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_TRIES: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

/// Pre-configured HTTP session.
///
/// Every request carries the User-Agent
/// `wmflib/<version> <name> +https://wikitech.wikimedia.org/wiki/Python/Wmflib`.
#[derive(Debug, Clone)]
pub struct HttpSession {
    user_agent: String,
    timeout: Duration,
    idempotent: RetryPolicy<HttpError>,
    non_idempotent: RetryPolicy<HttpError>,
}

/// Builder for [`HttpSession`].
#[derive(Debug, Clone)]
pub struct HttpSessionBuilder {
    name: String,
    timeout: Duration,
    tries: u32,
    backoff: Duration,
}

impl HttpSessionBuilder {
    /// Default timeout for all requests of the session.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total number of requests to perform before giving up.
    pub fn tries(mut self, tries: u32) -> Self {
        self.tries = tries;
        self
    }

    /// Backoff factor: sleeps `backoff * 2^(n-1)` after the n-th failure.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn build(self) -> Result<HttpSession, HttpError> {
        let message = format!("HTTP request from {} failed", self.name);
        let idempotent = RetryPolicy::builder()
            .tries(self.tries)
            .delay(self.backoff)
            .backoff_mode(BackoffMode::Exponential)
            .failure_message(message.clone())
            .retry_on(HttpError::is_retryable)
            .build()?;
        let non_idempotent = RetryPolicy::builder()
            .tries(self.tries)
            .delay(self.backoff)
            .backoff_mode(BackoffMode::Exponential)
            .failure_message(message)
            .retry_on(HttpError::is_connect_failure)
            .build()?;

        Ok(HttpSession {
            user_agent: format!(
                "wmflib/{} {} +https://wikitech.wikimedia.org/wiki/Python/Wmflib",
                crate::VERSION,
                self.name
            ),
            timeout: self.timeout,
            idempotent,
            non_idempotent,
        })
    }
}

impl HttpSession {
    /// Session named `name` (`name` or `name/version`) with default timeout and retries.
    pub fn new(name: &str) -> Result<Self, HttpError> {
        Self::builder(name).build()
    }

    pub fn builder(name: &str) -> HttpSessionBuilder {
        HttpSessionBuilder {
            name: name.to_string(),
            timeout: DEFAULT_TIMEOUT,
            tries: DEFAULT_TRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with `params` appended to its query string.
    pub fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<Response, HttpError> {
        self.get_with_timeout(url, params, self.timeout)
    }

    /// Like [`HttpSession::get`] with a per-request timeout.
    pub fn get_with_timeout(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Response, HttpError> {
        let url = with_query(url, params)?;
        retry(&self.idempotent, || {
            self.perform(Method::Get, url.as_str(), None, timeout)
        })
    }

    /// POST `form` as `application/x-www-form-urlencoded`.
    pub fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Response, HttpError> {
        let url = Url::parse(url)?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        retry(&self.non_idempotent, || {
            self.perform(Method::Post, url.as_str(), Some(body.as_bytes()), self.timeout)
        })
    }

    fn perform(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<Response, HttpError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.useragent(&self.user_agent)?;
        easy.follow_location(true)?;
        easy.timeout(timeout)?;
        if let Some(body) = body {
            easy.post(true)?;
            easy.post_fields_copy(body)?;
        }

        let mut data = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|chunk| {
                data.extend_from_slice(chunk);
                Ok(chunk.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        tracing::debug!("{:?} {} returned HTTP {}", method, url, status);
        if method == Method::Get && RETRY_STATUSES.contains(&status) {
            return Err(HttpError::RetryableStatus(status));
        }
        Ok(Response { status, body: data })
    }
}

fn with_query(url: &str, params: &[(&str, &str)]) -> Result<Url, HttpError> {
    let mut url = Url::parse(url)?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_carries_name_and_version() {
        let s = HttpSession::new("cookbooks/1.0").unwrap();
        assert_eq!(
            s.user_agent(),
            format!(
                "wmflib/{} cookbooks/1.0 +https://wikitech.wikimedia.org/wiki/Python/Wmflib",
                crate::VERSION
            )
        );
        assert_eq!(s.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn zero_tries_is_rejected() {
        let res = HttpSession::builder("x").tries(0).build();
        assert!(matches!(res, Err(HttpError::InvalidParams(_))));
    }

    #[test]
    fn query_params_are_encoded() {
        let url = with_query(
            "http://prometheus.example.org/ops/api/v1/query",
            &[("query", r#"up{job="node"}"#)],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://prometheus.example.org/ops/api/v1/query?query=up%7Bjob%3D%22node%22%7D"
        );
    }

    #[test]
    fn no_params_leaves_url_alone() {
        let url = with_query("https://example.org/path?x=1", &[]).unwrap();
        assert_eq!(url.as_str(), "https://example.org/path?x=1");
    }

    #[test]
    fn invalid_url_is_rejected_before_any_request() {
        let s = HttpSession::new("test").unwrap();
        assert!(matches!(s.get("not a url", &[]), Err(HttpError::Url(_))));
    }

    #[test]
    fn refused_connection_is_retried_then_returned() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let s = HttpSession::builder("test")
            .tries(2)
            .backoff(Duration::from_millis(1))
            .build()
            .unwrap();
        let err = s.get(&format!("http://127.0.0.1:{port}/"), &[]).unwrap_err();
        assert!(err.is_connect_failure());
    }
}
