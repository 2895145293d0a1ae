//! Predicate views over endpoints and results

use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;
use crate::http::HttpMethod;
use crate::verdict::{Severity, TestResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointFilter {
    /// Substring the endpoint URL must contain
    pub url_contains: Option<String>,
    pub method: Option<HttpMethod>,
}

impl EndpointFilter {
    #[must_use]
    pub fn matches(&self, endpoint: &Endpoint) -> bool {
        self.url_contains
            .as_deref()
            .is_none_or(|needle| endpoint.url.contains(needle))
            && self.method.is_none_or(|m| m == endpoint.method())
    }

    /// Endpoints passing the filter, in order.
    pub fn apply<'a>(&self, endpoints: &'a [Endpoint]) -> Vec<&'a Endpoint> {
        endpoints.iter().filter(|e| self.matches(e)).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultFilter {
    pub url_contains: Option<String>,
    pub method: Option<HttpMethod>,
    /// Results below this severity are hidden
    pub min_severity: Option<Severity>,
}

impl TestResultFilter {
    #[must_use]
    pub fn matches(&self, result: &TestResult) -> bool {
        self.min_severity.is_none_or(|min| result.severity >= min)
            && self
                .url_contains
                .as_deref()
                .is_none_or(|needle| result.endpoint.url.contains(needle))
            && self.method.is_none_or(|m| m == result.endpoint.method())
    }

    pub fn apply(&self, results: &[TestResult]) -> Vec<TestResult> {
        results.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}
