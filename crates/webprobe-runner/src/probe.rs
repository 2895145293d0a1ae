//! The three probes: contract match, random fuzz, SQL injection
//!
//! Every probe returns a [`TestResult`]; dispatch failures are classified,
//! never propagated. Classification itself is pure and total.

use std::sync::Arc;
use std::time::Instant;

use rand::Rng;

use webprobe_core::{
    Endpoint, ErrorMatcher, HttpRequest, HttpResponse, PartialDictionary, ProbeKind, Severity,
    TestResult,
};

use crate::client::{HttpClient, OutgoingRequest};
use crate::mutate::{Replacement, mutate_request};

/// Verdict for a probe that got its expected response
pub const VERDICT_OK: &str = "Got expected response";

/// Runs probes against one client with one error phrase matcher.
#[derive(Clone, Copy)]
pub struct Prober<'a> {
    client: &'a dyn HttpClient,
    matcher: &'a ErrorMatcher,
}

impl<'a> Prober<'a> {
    #[must_use]
    pub fn new(client: &'a dyn HttpClient, matcher: &'a ErrorMatcher) -> Self {
        Self { client, matcher }
    }

    /// Send the template request and compare against the full contract.
    pub fn match_probe(
        &self,
        endpoint: &Arc<Endpoint>,
        cookies: Option<&PartialDictionary>,
    ) -> TestResult {
        tracing::info!("Starting match test for {}", endpoint.label());
        let request = with_cookie_state(endpoint.request(), cookies);
        self.dispatch(endpoint, ProbeKind::Match, request, |actual| {
            classify_match(endpoint.expected(), actual, self.matcher)
        })
    }

    /// Send the template with every body leaf replaced by random data.
    pub fn fuzz_probe(
        &self,
        endpoint: &Arc<Endpoint>,
        cookies: Option<&PartialDictionary>,
        rng: &mut impl Rng,
    ) -> TestResult {
        tracing::info!("Starting fuzz test for {}", endpoint.label());
        if !endpoint.method().allows_body() {
            return TestResult::skipped(Arc::clone(endpoint), ProbeKind::Fuzz, "Cannot fuzz DELETE");
        }
        let mutated = mutate_request(endpoint.request(), Replacement::Random, rng);
        let request = with_cookie_state(&mutated, cookies);
        self.dispatch(endpoint, ProbeKind::Fuzz, request, |actual| {
            classify_mutation(endpoint.expected(), actual, self.matcher)
        })
    }

    /// Send the template with body leaves replaced by picks from `payloads`.
    pub fn sql_injection_probe(
        &self,
        endpoint: &Arc<Endpoint>,
        payloads: &[String],
        cookies: Option<&PartialDictionary>,
        rng: &mut impl Rng,
    ) -> TestResult {
        tracing::info!("Starting SQL injection test for {}", endpoint.label());
        if !endpoint.method().allows_body() {
            return TestResult::skipped(
                Arc::clone(endpoint),
                ProbeKind::SqlInjection,
                "Cannot inject into DELETE",
            );
        }
        let mutated = mutate_request(endpoint.request(), Replacement::Wordlist(payloads), rng);
        let request = with_cookie_state(&mutated, cookies);
        self.dispatch(endpoint, ProbeKind::SqlInjection, request, |actual| {
            classify_mutation(endpoint.expected(), actual, self.matcher)
        })
    }

    fn dispatch(
        &self,
        endpoint: &Arc<Endpoint>,
        probe: ProbeKind,
        request: HttpRequest,
        classify: impl FnOnce(&HttpResponse) -> (Severity, &'static str),
    ) -> TestResult {
        let outgoing = OutgoingRequest::new(endpoint, &request);
        let start = Instant::now();
        let sent = self.client.send(&outgoing);
        let elapsed = start.elapsed();

        match sent {
            Ok(live) => {
                tracing::info!("Got response from {} ({})", endpoint.label(), live.status);
                let actual = live.into_response();
                let verdict = classify(&actual);
                TestResult::classified(
                    Arc::clone(endpoint),
                    probe,
                    verdict,
                    elapsed,
                    request,
                    actual,
                )
            }
            Err(err) => {
                tracing::error!("{probe} test for {} failed: {err}", endpoint.label());
                TestResult::failed(Arc::clone(endpoint), probe, elapsed, request, err)
            }
        }
    }
}

/// Template with the running cookie state applied. The template's own
/// cookies win over chained ones.
#[must_use]
pub fn with_cookie_state(template: &HttpRequest, cookies: Option<&PartialDictionary>) -> HttpRequest {
    let mut request = template.clone();
    if let Some(state) = cookies {
        request.cookies = PartialDictionary::merge(state, &template.cookies);
    }
    request
}

/// Contract waterfall for the match probe. First matching rule wins.
#[must_use]
pub fn classify_match(
    expected: &HttpResponse,
    actual: &HttpResponse,
    matcher: &ErrorMatcher,
) -> (Severity, &'static str) {
    if !expected.is_client_error() && matcher.is_match(&actual.body) {
        (Severity::Critical, "Found errors in response")
    } else if actual.is_server_error() {
        (Severity::Critical, "Server error in status found")
    } else if expected.body_kind != actual.body_kind {
        (Severity::Critical, "Unmatched body type")
    } else if !expected.body.is_empty() && expected.body != actual.body {
        (Severity::Critical, "Unmatched body")
    } else if expected.status != actual.status {
        (Severity::Danger, "Unmatched return status")
    } else if !cookies_subset(&expected.cookies, &actual.cookies) {
        (Severity::Danger, "Unmatched cookies")
    } else if !headers_subset(&expected.headers, &actual.headers) {
        (Severity::Danger, "Unmatched headers")
    } else {
        (Severity::Ok, VERDICT_OK)
    }
}

/// Waterfall for fuzz and SQL-injection probes, which cannot expect an exact body.
#[must_use]
pub fn classify_mutation(
    expected: &HttpResponse,
    actual: &HttpResponse,
    matcher: &ErrorMatcher,
) -> (Severity, &'static str) {
    if !actual.is_client_error() && matcher.is_match(&actual.body) {
        (Severity::Critical, "Found non-client errors")
    } else if expected.body_kind != actual.body_kind {
        (Severity::Critical, "Unmatched body type")
    } else if actual.is_server_error() {
        (Severity::Critical, "Server error in status found")
    } else {
        (Severity::Ok, VERDICT_OK)
    }
}

/// Every expected cookie name is present in the response.
fn cookies_subset(expected: &PartialDictionary, actual: &PartialDictionary) -> bool {
    let actual = actual.get();
    expected.get().keys().all(|k| actual.contains_key(k))
}

/// Every expected header is present; names and values compared case-insensitively.
fn headers_subset(expected: &PartialDictionary, actual: &PartialDictionary) -> bool {
    expected.get().iter().all(|(name, value)| {
        actual.elements.iter().any(|h| {
            h.enabled
                && h.key.eq_ignore_ascii_case(name)
                && h.value.to_lowercase() == value.to_lowercase()
        })
    })
}
