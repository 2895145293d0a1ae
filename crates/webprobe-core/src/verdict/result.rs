//! Outcome of one probe run

use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{DispatchError, Severity};
use crate::endpoint::Endpoint;
use crate::http::{HttpRequest, HttpResponse};

/// Which probe produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    Match,
    Fuzz,
    SqlInjection,
}

impl ProbeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Fuzz => "fuzz",
            Self::SqlInjection => "sql injection",
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified outcome. Built once by a probe and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TestResult {
    pub endpoint: Arc<Endpoint>,
    pub probe: ProbeKind,
    pub severity: Severity,
    pub verdict: String,
    pub elapsed: Duration,
    /// Request actually sent (the template unless the probe mutated it)
    pub request: HttpRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DispatchError>,
}

impl TestResult {
    /// Result for a response that was received and classified.
    #[must_use]
    pub fn classified(
        endpoint: Arc<Endpoint>,
        probe: ProbeKind,
        (severity, verdict): (Severity, &str),
        elapsed: Duration,
        request: HttpRequest,
        response: HttpResponse,
    ) -> Self {
        Self {
            endpoint,
            probe,
            severity,
            verdict: verdict.to_string(),
            elapsed,
            request,
            response: Some(response),
            error: None,
        }
    }

    /// Result for a dispatch that produced no response.
    #[must_use]
    pub fn failed(
        endpoint: Arc<Endpoint>,
        probe: ProbeKind,
        elapsed: Duration,
        request: HttpRequest,
        error: DispatchError,
    ) -> Self {
        let (severity, verdict) = error.classify();
        Self {
            endpoint,
            probe,
            severity,
            verdict: verdict.to_string(),
            elapsed,
            request,
            response: None,
            error: Some(error),
        }
    }

    /// Result for a probe that declined to dispatch.
    #[must_use]
    pub fn skipped(endpoint: Arc<Endpoint>, probe: ProbeKind, verdict: &str) -> Self {
        let request = endpoint.interaction.request.clone();
        Self {
            endpoint,
            probe,
            severity: Severity::Warning,
            verdict: verdict.to_string(),
            elapsed: Duration::ZERO,
            request,
            response: None,
            error: None,
        }
    }
}
