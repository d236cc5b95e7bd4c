//! Endpoint prober
//!
//! Issues a single GET against a catalog or product URL and surfaces the
//! status, body, or failure condition to the caller. Nothing is retried or
//! recovered: a read-timeout comes back as a read-timeout.
//!
//! Requests go through a [`Transport`]:
//!
//! - [`HttpTransport`] performs real network I/O with `reqwest`
//! - [`MockTransport`] answers from pre-registered responses and failures
//!
//! # Example
//!
//! ```
//! use teda_check::probe::{MockResponse, MockTransport, Prober};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mock = MockTransport::new();
//! mock.add_response(MockResponse::new(204).text("ingesting"));
//!
//! let prober = Prober::new(mock);
//! let response = prober.probe("https://teda.com/catalog").await?;
//! assert_eq!(response.status(), 204);
//! assert_eq!(response.text()?, "ingesting");
//! # Ok(())
//! # }
//! ```

pub mod expect;
pub mod http;
pub mod mock;

pub use expect::{ExpectedBody, ExpectedResponse, FailureMode, Mismatch};
pub use http::HttpTransport;
pub use mock::{MockResponse, MockTransport};

use crate::config::EndpointsConfig;
use crate::metrics;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use thiserror::Error;

/// The two probed endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Catalog,
    Product,
}

impl Endpoint {
    pub const ALL: [Endpoint; 2] = [Endpoint::Catalog, Endpoint::Product];

    /// Resolve the configured URL for this endpoint
    pub fn url<'a>(&self, endpoints: &'a EndpointsConfig) -> &'a str {
        match self {
            Endpoint::Catalog => &endpoints.catalog,
            Endpoint::Product => &endpoints.product,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Catalog => "catalog",
            Endpoint::Product => "product",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "catalog" => Ok(Endpoint::Catalog),
            "product" => Ok(Endpoint::Product),
            other => Err(format!("unknown endpoint '{}'", other)),
        }
    }
}

/// Failure conditions a probe can surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connected, but no response bytes arrived in time
    ReadTimeout,
    /// Any other timeout (connect, overall deadline, unmatched mock)
    Timeout,
    /// The response could not be read
    ReadError,
    /// The connection could not be established
    Connect,
    Other,
}

impl FailureKind {
    /// A read-timeout is a timeout too
    pub fn is_timeout(&self) -> bool {
        matches!(self, FailureKind::ReadTimeout | FailureKind::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ReadTimeout => "read_timeout",
            FailureKind::Timeout => "timeout",
            FailureKind::ReadError => "read_error",
            FailureKind::Connect => "connect",
            FailureKind::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probe errors
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Read timeout on GET {url}: {message}")]
    ReadTimeout { url: String, message: String },

    #[error("Timeout on GET {url}: {message}")]
    Timeout { url: String, message: String },

    #[error("Failed to read response from GET {url}: {message}")]
    ReadError { url: String, message: String },

    #[error("Connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response body is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl ProbeError {
    /// Build an error of the given kind
    pub fn of_kind(kind: FailureKind, url: &str, message: impl Into<String>) -> Self {
        let url = url.to_string();
        let message = message.into();
        match kind {
            FailureKind::ReadTimeout => ProbeError::ReadTimeout { url, message },
            FailureKind::Timeout => ProbeError::Timeout { url, message },
            FailureKind::ReadError => ProbeError::ReadError { url, message },
            FailureKind::Connect => ProbeError::Connect { url, message },
            FailureKind::Other => ProbeError::Request { url, message },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ProbeError::ReadTimeout { .. } => FailureKind::ReadTimeout,
            ProbeError::Timeout { .. } => FailureKind::Timeout,
            ProbeError::ReadError { .. } | ProbeError::Json(_) | ProbeError::Utf8(_) => {
                FailureKind::ReadError
            }
            ProbeError::Connect { .. } => FailureKind::Connect,
            ProbeError::Request { .. } => FailureKind::Other,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind().is_timeout()
    }
}

/// A fully read HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    status: u16,
    content_type: Option<String>,
    body: Bytes,
}

impl ProbeResponse {
    pub fn new(status: u16, content_type: Option<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decode the body as UTF-8 text
    pub fn text(&self) -> Result<&str, ProbeError> {
        Ok(std::str::from_utf8(&self.body)?)
    }

    /// Decode the body as JSON
    pub fn json(&self) -> Result<serde_json::Value, ProbeError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Performs a single GET
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<ProbeResponse, ProbeError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn get(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        (**self).get(url).await
    }
}

/// Single-GET prober over a transport
pub struct Prober<T> {
    transport: T,
}

impl<T: Transport> Prober<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `url` once and return the response or the failure as-is
    #[tracing::instrument(
        name = "probe.get",
        skip(self),
        fields(http.method = "GET", http.status_code = tracing::field::Empty)
    )]
    pub async fn probe(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        let start_time = Instant::now();
        let result = self.transport.get(url).await;
        let duration = start_time.elapsed();

        match &result {
            Ok(response) => {
                tracing::Span::current().record("http.status_code", response.status());
                metrics::record_probe("ok", duration.as_secs_f64());
                tracing::info!(
                    status = response.status(),
                    bytes = response.body().len(),
                    duration_ms = duration.as_millis(),
                    "Probe completed"
                );
            }
            Err(e) => {
                metrics::record_probe(e.kind().as_str(), duration.as_secs_f64());
                tracing::warn!(
                    kind = %e.kind(),
                    error = %e,
                    duration_ms = duration.as_millis(),
                    "Probe failed"
                );
            }
        }

        result
    }

    /// Probe `url` and check the outcome against `expected`
    pub async fn check(&self, url: &str, expected: &ExpectedResponse) -> Result<(), Mismatch> {
        let outcome = self.probe(url).await;
        expected.verify(&outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let endpoints = EndpointsConfig::default();
        assert_eq!(Endpoint::Catalog.url(&endpoints), "https://teda.com/catalog");
        assert_eq!(Endpoint::Product.url(&endpoints), "https://teda.com/product");
    }

    #[test]
    fn test_endpoint_from_str() {
        assert_eq!("Catalog".parse::<Endpoint>().unwrap(), Endpoint::Catalog);
        assert!("orders".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_read_timeout_is_a_timeout() {
        let err = ProbeError::of_kind(FailureKind::ReadTimeout, "https://teda.com/catalog", "slow");
        assert!(matches!(err, ProbeError::ReadTimeout { .. }));
        assert!(err.is_timeout());
        assert!(!ProbeError::of_kind(FailureKind::ReadError, "u", "m").is_timeout());
    }

    #[test]
    fn test_response_decoders() {
        let response = ProbeResponse::new(
            200,
            Some("application/json".into()),
            r#"{"status":"complete"}"#,
        );
        assert_eq!(response.json().unwrap(), serde_json::json!({"status": "complete"}));
        assert_eq!(response.text().unwrap(), r#"{"status":"complete"}"#);

        let text = ProbeResponse::new(204, None, "ingesting");
        assert!(matches!(text.json(), Err(ProbeError::Json(_))));
    }
}
