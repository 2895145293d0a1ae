//! Network-layer failures and their fixed classification

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Severity;

/// Failure to obtain any response from the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DispatchError {
    /// Endpoint's max wait elapsed
    #[error("timed out: {0}")]
    ConnectTimeout(String),
    /// Refused, reset, DNS failure
    #[error("connection failed: {0}")]
    Connection(String),
    /// Malformed response, redirect loop, undecodable body
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("{0}")]
    Other(String),
}

impl DispatchError {
    /// Severity and verdict for a probe that got no response.
    #[must_use]
    pub const fn classify(&self) -> (Severity, &'static str) {
        match self {
            Self::ConnectTimeout(_) => (Severity::Critical, "Connection timeout (exceeded max wait)"),
            Self::Connection(_) => (Severity::Warning, "Connection error"),
            Self::Protocol(_) => (Severity::Danger, "HTTP error"),
            Self::Other(_) => (Severity::Warning, "Unknown error"),
        }
    }
}
