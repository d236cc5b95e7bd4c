//! Mocking layer for probes
//!
//! [`MockTransport`] never touches the network. It answers GET requests from
//! registered responses or simulated failures:
//!
//! - the first unused registration matching the URL answers the request
//! - once all matching registrations were used, the last one is reused
//! - with no matching registration the request fails with a generic
//!   [`ProbeError::Timeout`]
//!
//! Registrations without a URL match any request.

use super::{FailureKind, ProbeError, ProbeResponse, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;

/// A canned response
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    status: u16,
    content_type: Option<String>,
    body: Bytes,
    url: Option<String>,
}

impl MockResponse {
    /// Empty response with the given status
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Bytes::new(),
            url: None,
        }
    }

    /// Set a text body
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.content_type = Some("text/plain; charset=utf-8".to_string());
        self.body = Bytes::from(body.into());
        self
    }

    /// Set a JSON body
    pub fn json(mut self, body: &Value) -> Self {
        self.content_type = Some("application/json".to_string());
        self.body = Bytes::from(body.to_string());
        self
    }

    /// Only answer requests for this URL
    pub fn for_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    fn to_response(&self) -> ProbeResponse {
        ProbeResponse::new(self.status, self.content_type.clone(), self.body.clone())
    }
}

/// How a case prepares the mocking layer
#[derive(Debug, Clone, PartialEq)]
pub enum MockSetup {
    /// Nothing registered
    None,
    Respond(MockResponse),
    Fail { kind: FailureKind, message: String },
}

impl MockSetup {
    pub fn apply(&self, mock: &MockTransport) {
        match self {
            MockSetup::None => {}
            MockSetup::Respond(response) => mock.add_response(response.clone()),
            MockSetup::Fail { kind, message } => mock.add_failure(*kind, message.clone()),
        }
    }
}

/// Mock verification errors
#[derive(Error, Debug, PartialEq)]
pub enum MockError {
    #[error("registered but never requested: {}", .0.join(", "))]
    NotRequested(Vec<String>),
}

#[derive(Debug)]
enum Reply {
    Response(MockResponse),
    Failure { kind: FailureKind, message: String },
}

#[derive(Debug)]
struct Registration {
    url: Option<String>,
    reply: Reply,
    hits: usize,
}

impl Registration {
    fn matches(&self, url: &str) -> bool {
        self.url.as_deref().map_or(true, |expected| expected == url)
    }

    fn describe(&self) -> String {
        let target = self.url.as_deref().unwrap_or("any URL");
        match &self.reply {
            Reply::Response(response) => format!("{} response for GET {}", response.status, target),
            Reply::Failure { kind, .. } => format!("{} failure for GET {}", kind, target),
        }
    }
}

/// In-memory transport answering from registrations
#[derive(Debug, Default)]
pub struct MockTransport {
    registrations: Mutex<Vec<Registration>>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response
    pub fn add_response(&self, response: MockResponse) {
        self.registrations.lock().push(Registration {
            url: response.url.clone(),
            reply: Reply::Response(response),
            hits: 0,
        });
    }

    /// Register a failure for any URL
    pub fn add_failure(&self, kind: FailureKind, message: impl Into<String>) {
        self.push_failure(None, kind, message.into());
    }

    /// Register a failure for one URL
    pub fn add_failure_for(
        &self,
        url: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) {
        self.push_failure(Some(url.into()), kind, message.into());
    }

    fn push_failure(&self, url: Option<String>, kind: FailureKind, message: String) {
        self.registrations.lock().push(Registration {
            url,
            reply: Reply::Failure { kind, message },
            hits: 0,
        });
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Fail if any registration was never used
    pub fn assert_all_requested(&self) -> Result<(), MockError> {
        let unused: Vec<String> = self
            .registrations
            .lock()
            .iter()
            .filter(|r| r.hits == 0)
            .map(Registration::describe)
            .collect();

        if unused.is_empty() {
            Ok(())
        } else {
            Err(MockError::NotRequested(unused))
        }
    }

    /// Drop all registrations and recorded requests
    pub fn reset(&self) {
        self.registrations.lock().clear();
        self.requests.lock().clear();
    }

    fn answer(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        let mut registrations = self.registrations.lock();

        let index = registrations
            .iter()
            .position(|r| r.hits == 0 && r.matches(url))
            .or_else(|| registrations.iter().rposition(|r| r.matches(url)));

        let Some(index) = index else {
            return Err(ProbeError::Timeout {
                url: url.to_string(),
                message: format!("No response can be found for GET request on {}", url),
            });
        };

        let registration = &mut registrations[index];
        registration.hits += 1;

        match &registration.reply {
            Reply::Response(response) => Ok(response.to_response()),
            Reply::Failure { kind, message } => {
                Err(ProbeError::of_kind(*kind, url, message.clone()))
            }
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        self.requests.lock().push(url.to_string());
        let result = self.answer(url);
        tracing::debug!(url = %url, ok = result.is_ok(), "Mock transport answered");
        result
    }
}
