//! Live HTTP transport
//!
//! `reqwest` client with a connect timeout and a read timeout; the whole
//! request is additionally bounded by an overall deadline.
//!
//! | Condition | Error |
//! |-----------|-------|
//! | no bytes within the read timeout | [`ProbeError::ReadTimeout`] |
//! | connect timeout or overall deadline | [`ProbeError::Timeout`] |
//! | connection refused / DNS failure | [`ProbeError::Connect`] |
//! | body could not be read | [`ProbeError::ReadError`] |

use super::{ProbeError, ProbeResponse, Transport};
use crate::config::EndpointsConfig;
use async_trait::async_trait;
use std::time::Duration;

/// `reqwest` backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with explicit timeouts
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()
            .map_err(|e| ProbeError::Request {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, timeout })
    }

    /// Create a transport from the `[endpoints]` section
    pub fn from_config(endpoints: &EndpointsConfig) -> Result<Self, ProbeError> {
        Self::new(
            endpoints.connect_timeout(),
            endpoints.read_timeout(),
            endpoints.timeout(),
        )
    }

    async fn fetch(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::ReadTimeout {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            } else {
                ProbeError::ReadError {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(ProbeResponse::new(status, content_type, body))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        match tokio::time::timeout(self.timeout, self.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout {
                url: url.to_string(),
                message: format!("no complete response within {:?}", self.timeout),
            }),
        }
    }
}

/// Map a `reqwest` send error onto a probe failure
///
/// Only the connect phase and the read phase have timeouts on the client,
/// so a timeout outside the connect phase is a read-timeout.
fn classify(url: &str, e: reqwest::Error) -> ProbeError {
    let url = url.to_string();
    let message = e.to_string();

    if e.is_timeout() && e.is_connect() {
        ProbeError::Timeout { url, message }
    } else if e.is_timeout() {
        ProbeError::ReadTimeout { url, message }
    } else if e.is_connect() {
        ProbeError::Connect { url, message }
    } else if e.is_body() || e.is_decode() {
        ProbeError::ReadError { url, message }
    } else {
        ProbeError::Request { url, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let transport = HttpTransport::from_config(&EndpointsConfig::default()).unwrap();
        assert_eq!(transport.timeout, Duration::from_secs(30));
    }
}
