//! Prometheus and Thanos query clients.

use crate::constants::{is_datacenter, ALL_DATACENTERS};
use crate::http::{HttpError, HttpSession};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-site Prometheus query endpoint; `{site}` and `{instance}` are substituted.
pub const PROMETHEUS_API: &str = "http://prometheus.svc.{site}.wmnet/{instance}/api/v1/query";
/// Global Thanos query endpoint.
pub const THANOS_API: &str = "https://thanos-query.discovery.wmnet/api/v1/query";
/// How long to wait for a query answer by default.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Prometheus instance queried when none is given.
pub const DEFAULT_INSTANCE: &str = "ops";

#[derive(Debug, thiserror::Error)]
pub enum PrometheusError {
    #[error("site ({site}) must be one of {:?}", ALL_DATACENTERS)]
    UnknownSite { site: String },

    #[error("Unable to get metric: HTTP {code}: {body}")]
    Status { code: u32, body: String },

    #[error("Unable to get metric: {0}")]
    Api(String),

    #[error(transparent)]
    Http(#[from] HttpError),
}

/// One series of a query result.
///
/// Instant queries fill `value`, range queries fill `values`. Each point is
/// `(unix timestamp, value as string)` as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub value: Option<(f64, String)>,
    #[serde(default)]
    pub values: Option<Vec<(f64, String)>>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: Option<String>,
    error: Option<String>,
    data: Option<ApiData>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    #[serde(default)]
    result: Vec<Sample>,
}

/// Shared query plumbing for Prometheus-like APIs.
#[derive(Debug, Clone)]
struct QueryClient {
    session: HttpSession,
}

impl QueryClient {
    fn query(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Vec<Sample>, PrometheusError> {
        let response = self.session.get_with_timeout(url, params, timeout)?;
        if !response.is_ok() {
            return Err(PrometheusError::Status {
                code: response.status,
                body: response.text().into_owned(),
            });
        }

        let result: ApiResponse = response.json()?;
        if result.status.as_deref().unwrap_or("error") == "error" {
            return Err(PrometheusError::Api(
                result.error.unwrap_or_else(|| "unknown".to_string()),
            ));
        }
        Ok(result.data.map(|d| d.result).unwrap_or_default())
    }
}

/// Options for [`Prometheus::query_with`].
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Prometheus instance on the site (`ops`, `global`, `k8s`...).
    pub instance: String,
    pub timeout: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            instance: DEFAULT_INSTANCE.to_string(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

/// Client for the per-site Prometheus APIs.
#[derive(Debug, Clone)]
pub struct Prometheus {
    client: QueryClient,
    url_template: String,
}

impl Prometheus {
    pub fn new() -> Result<Self, PrometheusError> {
        Self::with_url_template(PROMETHEUS_API)
    }

    /// Query a different endpoint; `url_template` may use `{site}` and `{instance}`.
    pub fn with_url_template(url_template: &str) -> Result<Self, PrometheusError> {
        let session = HttpSession::new("wmflib::prometheus::Prometheus")?;
        Ok(Self::with_session(session, url_template))
    }

    pub fn with_session(session: HttpSession, url_template: &str) -> Self {
        Self {
            client: QueryClient { session },
            url_template: url_template.to_string(),
        }
    }

    /// Run `query` on the `ops` instance of `site`.
    pub fn query(&self, query: &str, site: &str) -> Result<Vec<Sample>, PrometheusError> {
        self.query_with(query, site, &QueryOptions::default())
    }

    /// Run `query` on `site`. `site` must be one of [`ALL_DATACENTERS`].
    pub fn query_with(
        &self,
        query: &str,
        site: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Sample>, PrometheusError> {
        if !is_datacenter(site) {
            return Err(PrometheusError::UnknownSite {
                site: site.to_string(),
            });
        }
        let url = self
            .url_template
            .replace("{site}", site)
            .replace("{instance}", &options.instance);
        self.client.query(&url, &[("query", query)], options.timeout)
    }
}

/// Client for the Thanos query endpoint, which sees every site at once.
#[derive(Debug, Clone)]
pub struct Thanos {
    client: QueryClient,
    endpoint: String,
}

impl Thanos {
    pub fn new() -> Result<Self, PrometheusError> {
        Self::with_endpoint(THANOS_API)
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self, PrometheusError> {
        let session = HttpSession::new("wmflib::prometheus::Thanos")?;
        Ok(Self::with_session(session, endpoint))
    }

    pub fn with_session(session: HttpSession, endpoint: &str) -> Self {
        Self {
            client: QueryClient { session },
            endpoint: endpoint.to_string(),
        }
    }

    /// Run a deduplicated query, refusing partial responses.
    pub fn query(&self, query: &str) -> Result<Vec<Sample>, PrometheusError> {
        self.query_with_timeout(query, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn query_with_timeout(
        &self,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<Sample>, PrometheusError> {
        let params = [
            ("dedup", "true"),
            ("partial_response", "false"),
            ("query", query),
        ];
        self.client.query(&self.endpoint, &params, timeout)
    }
}
