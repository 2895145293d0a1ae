//! HTTP dispatch seam
//!
//! Probes talk to the network only through [`HttpClient`]; the production
//! implementation wraps a blocking reqwest client.

use std::collections::BTreeMap;
use std::time::Duration;

use webprobe_core::{
    BodyPayload, DispatchError, Endpoint, HttpMethod, HttpRequest, HttpResponse,
    PartialDictionary, RequestBody,
};

/// Fully resolved request, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest<'a> {
    pub method: HttpMethod,
    pub url: &'a str,
    pub body: Option<BodyPayload>,
    /// Body is JSON text
    pub json: bool,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl<'a> OutgoingRequest<'a> {
    /// Resolve `request` against the endpoint's URL and max wait.
    #[must_use]
    pub fn new(endpoint: &'a Endpoint, request: &HttpRequest) -> Self {
        Self {
            method: request.method,
            url: &endpoint.url,
            body: request.payload(),
            json: matches!(request.body, RequestBody::Json(_)),
            headers: request.headers.get(),
            cookies: request.cookies.get(),
            timeout: Duration::from_secs(endpoint.max_wait_seconds),
        }
    }

    /// `Cookie` header value, `None` when there are no cookies.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Response as received, before body-kind inference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
}

impl LiveResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Convert into the model's response, inferring JSON vs HTML.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        HttpResponse::observed(
            self.status,
            self.body,
            PartialDictionary::from_mapping(self.headers),
            PartialDictionary::from_mapping(self.cookies),
        )
    }
}

/// Sends one request and reports either a response or a typed failure.
pub trait HttpClient: Send + Sync {
    /// # Errors
    ///
    /// Any failure to obtain a response, classified by kind.
    fn send(&self, request: &OutgoingRequest<'_>) -> Result<LiveResponse, DispatchError>;
}

/// Blocking reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// # Errors
    ///
    /// Returns error if the TLS backend or resolver cannot be initialised.
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: &OutgoingRequest<'_>) -> Result<LiveResponse, DispatchError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut req = self
            .client
            .request(method, request.url)
            .timeout(request.timeout);

        let mut has_content_type = false;
        for (k, v) in &request.headers {
            // Names or values that are invalid in HTTP never reach the server.
            if reqwest::header::HeaderName::from_bytes(k.as_bytes()).is_err()
                || reqwest::header::HeaderValue::from_str(v).is_err()
            {
                tracing::debug!("skipping invalid header {k:?}");
                continue;
            }
            has_content_type |= k.eq_ignore_ascii_case("content-type");
            req = req.header(k, v);
        }
        if let Some(cookie) = request.cookie_header() {
            if reqwest::header::HeaderValue::from_str(&cookie).is_ok() {
                req = req.header(reqwest::header::COOKIE, cookie);
            }
        }
        match &request.body {
            Some(BodyPayload::Text(text)) => {
                if request.json && !has_content_type {
                    req = req.header(reqwest::header::CONTENT_TYPE, "application/json");
                }
                req = req.body(text.clone());
            }
            Some(BodyPayload::Fields(fields)) => req = req.form(fields),
            None => {}
        }

        let resp = req.send().map_err(|e| classify_reqwest_error(&e))?;

        let status = resp.status().as_u16();
        let cookies = resp
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = resp.text().map_err(|e| classify_reqwest_error(&e))?;

        Ok(LiveResponse {
            status,
            body,
            headers,
            cookies,
        })
    }
}

/// Only a timeout while connecting counts as `ConnectTimeout`; a server that
/// accepts and then stalls falls through to `Other`.
fn classify_reqwest_error(err: &reqwest::Error) -> DispatchError {
    let detail = err.to_string();
    if err.is_timeout() && err.is_connect() {
        DispatchError::ConnectTimeout(detail)
    } else if err.is_connect() {
        DispatchError::Connection(detail)
    } else if err.is_timeout() {
        DispatchError::Other(detail)
    } else if err.is_status() || err.is_redirect() || err.is_body() || err.is_decode() {
        DispatchError::Protocol(detail)
    } else {
        DispatchError::Other(detail)
    }
}
