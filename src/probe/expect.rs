//! Expected probe outcomes
//!
//! An [`ExpectedResponse`] describes either a response (status plus an
//! optional body) or a failure condition, and checks a probe outcome
//! against it.

use super::{FailureKind, ProbeError, ProbeResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Expected body of a successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedBody {
    /// Compared structurally after decoding
    Json(Value),
    /// Compared byte-for-byte as text
    Text(String),
}

/// Failure condition a probe is expected to raise
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    #[default]
    None,
    /// Any timeout, read-timeouts included
    Timeout,
    ReadTimeout,
    ReadError,
}

impl FailureMode {
    /// Whether a failure of `kind` satisfies this mode
    pub fn accepts(&self, kind: FailureKind) -> bool {
        match self {
            FailureMode::None => false,
            FailureMode::Timeout => kind.is_timeout(),
            FailureMode::ReadTimeout => kind == FailureKind::ReadTimeout,
            FailureMode::ReadError => kind == FailureKind::ReadError,
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureMode::None => "none",
            FailureMode::Timeout => "timeout",
            FailureMode::ReadTimeout => "read_timeout",
            FailureMode::ReadError => "read_error",
        })
    }
}

impl FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(FailureMode::None),
            "timeout" => Ok(FailureMode::Timeout),
            "read_timeout" | "read-timeout" => Ok(FailureMode::ReadTimeout),
            "read_error" | "read-error" => Ok(FailureMode::ReadError),
            other => Err(format!(
                "unknown failure mode '{}': expected none, timeout, read_timeout or read_error",
                other
            )),
        }
    }
}

/// Why an outcome did not match
#[derive(Error, Debug, PartialEq)]
pub enum Mismatch {
    #[error("expected status {expected}, got {actual}")]
    Status { expected: u16, actual: u16 },

    #[error("expected JSON body {expected}, got {actual}")]
    JsonBody { expected: Value, actual: String },

    #[error("expected text body {expected:?}, got {actual:?}")]
    TextBody { expected: String, actual: String },

    #[error("expected a {expected} failure, got status {status}")]
    MissingFailure { expected: FailureMode, status: u16 },

    #[error("expected a {expected} failure, got {kind}: {message}")]
    WrongFailure {
        expected: FailureMode,
        kind: FailureKind,
        message: String,
    },

    #[error("unexpected {kind} failure: {message}")]
    UnexpectedFailure { kind: FailureKind, message: String },
}

/// Expected outcome of one probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedResponse {
    pub status: Option<u16>,
    pub body: Option<ExpectedBody>,
    #[serde(default)]
    pub failure: FailureMode,
}

impl ExpectedResponse {
    /// Expect this status; the body is not checked
    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            body: None,
            failure: FailureMode::None,
        }
    }

    /// Expect a status and a JSON body
    pub fn json(status: u16, body: Value) -> Self {
        Self::status(status).with_body(ExpectedBody::Json(body))
    }

    /// Expect a status and an exact text body
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::status(status).with_body(ExpectedBody::Text(body.into()))
    }

    /// Expect a failure condition
    pub fn failure(mode: FailureMode) -> Self {
        Self {
            status: None,
            body: None,
            failure: mode,
        }
    }

    pub fn with_body(mut self, body: ExpectedBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Check a probe outcome
    pub fn verify(&self, outcome: &Result<ProbeResponse, ProbeError>) -> Result<(), Mismatch> {
        match (self.failure, outcome) {
            (FailureMode::None, Ok(response)) => self.verify_response(response),
            (FailureMode::None, Err(e)) => Err(Mismatch::UnexpectedFailure {
                kind: e.kind(),
                message: e.to_string(),
            }),
            (mode, Ok(response)) => Err(Mismatch::MissingFailure {
                expected: mode,
                status: response.status(),
            }),
            (mode, Err(e)) if mode.accepts(e.kind()) => Ok(()),
            (mode, Err(e)) => Err(Mismatch::WrongFailure {
                expected: mode,
                kind: e.kind(),
                message: e.to_string(),
            }),
        }
    }

    fn verify_response(&self, response: &ProbeResponse) -> Result<(), Mismatch> {
        if let Some(expected) = self.status {
            if response.status() != expected {
                return Err(Mismatch::Status {
                    expected,
                    actual: response.status(),
                });
            }
        }

        match &self.body {
            None => Ok(()),
            Some(ExpectedBody::Json(expected)) => match response.json() {
                Ok(ref actual) if actual == expected => Ok(()),
                _ => Err(Mismatch::JsonBody {
                    expected: expected.clone(),
                    actual: String::from_utf8_lossy(response.body()).into_owned(),
                }),
            },
            Some(ExpectedBody::Text(expected)) => match response.text() {
                Ok(actual) if actual == expected => Ok(()),
                _ => Err(Mismatch::TextBody {
                    expected: expected.clone(),
                    actual: String::from_utf8_lossy(response.body()).into_owned(),
                }),
            },
        }
    }
}
