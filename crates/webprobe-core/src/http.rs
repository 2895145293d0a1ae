//! Request templates and response expectations

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dict::PartialDictionary;
use crate::ModelError;

/// Supported HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// DELETE requests never carry a body.
    #[must_use]
    pub const fn allows_body(self) -> bool {
        !matches!(self, Self::Delete)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(ModelError::UnknownMethod(s.to_string())),
        }
    }
}

/// Request body discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestBodyKind {
    Json,
    Raw,
    Form,
}

/// Request body, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum RequestBody {
    Json(String),
    Raw(String),
    Form(PartialDictionary),
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::Form(PartialDictionary::default())
    }
}

impl RequestBody {
    #[must_use]
    pub const fn kind(&self) -> RequestBodyKind {
        match self {
            Self::Json(_) => RequestBodyKind::Json,
            Self::Raw(_) => RequestBodyKind::Raw,
            Self::Form(_) => RequestBodyKind::Form,
        }
    }

    /// Empty body of the given kind
    #[must_use]
    pub fn empty(kind: RequestBodyKind) -> Self {
        match kind {
            RequestBodyKind::Json => Self::Json(String::new()),
            RequestBodyKind::Raw => Self::Raw(String::new()),
            RequestBodyKind::Form => Self::Form(PartialDictionary::default()),
        }
    }
}

/// What actually goes on the wire for a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPayload {
    Text(String),
    Fields(BTreeMap<String, String>),
}

/// Request template for an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HttpRequest {
    pub method: HttpMethod,
    #[serde(default)]
    pub body: RequestBody,
    #[serde(default)]
    pub headers: PartialDictionary,
    #[serde(default)]
    pub cookies: PartialDictionary,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: PartialDictionary) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: PartialDictionary) -> Self {
        self.cookies = cookies;
        self
    }

    /// # Errors
    ///
    /// `MalformedBody` when a JSON body does not parse.
    pub fn validate(&self) -> Result<(), ModelError> {
        if let RequestBody::Json(text) = &self.body {
            serde_json::from_str::<serde_json::Value>(text)
                .map_err(|e| ModelError::MalformedBody(format!("failed to validate json: {e}")))?;
        }
        Ok(())
    }

    /// Re-indent a JSON body. Unparsable bodies are left alone.
    pub fn prettify(&mut self) {
        if let RequestBody::Json(text) = &mut self.body {
            prettify_json(text);
        }
    }

    /// Body as sent, or `None` for DELETE.
    #[must_use]
    pub fn payload(&self) -> Option<BodyPayload> {
        if !self.method.allows_body() {
            return None;
        }
        Some(match &self.body {
            RequestBody::Json(text) | RequestBody::Raw(text) => BodyPayload::Text(text.clone()),
            RequestBody::Form(fields) => BodyPayload::Fields(fields.get()),
        })
    }
}

/// Response body discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseBodyKind {
    #[default]
    Json,
    Html,
    Raw,
}

impl ResponseBodyKind {
    /// `Json` if the body parses as JSON, otherwise `Html`.
    #[must_use]
    pub fn infer(body: &str) -> Self {
        if serde_json::from_str::<serde_json::Value>(body).is_ok() {
            Self::Json
        } else {
            Self::Html
        }
    }
}

/// Expected (authored) or observed (converted) response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub body_kind: ResponseBodyKind,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub headers: PartialDictionary,
    #[serde(default)]
    pub cookies: PartialDictionary,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::expect(200)
    }
}

impl HttpResponse {
    /// Expectation with the given status and an empty JSON body.
    #[must_use]
    pub fn expect(status: u16) -> Self {
        Self {
            status,
            body_kind: ResponseBodyKind::Json,
            body: String::new(),
            headers: PartialDictionary::default(),
            cookies: PartialDictionary::default(),
        }
    }

    /// Convert an observed response, inferring the body kind.
    #[must_use]
    pub fn observed(
        status: u16,
        body: String,
        headers: PartialDictionary,
        cookies: PartialDictionary,
    ) -> Self {
        let mut response = Self {
            status,
            body_kind: ResponseBodyKind::infer(&body),
            body,
            headers,
            cookies,
        };
        response.prettify();
        response
    }

    #[must_use]
    pub fn with_body(mut self, kind: ResponseBodyKind, body: impl Into<String>) -> Self {
        self.body_kind = kind;
        self.body = body.into();
        self.prettify();
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: PartialDictionary) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: PartialDictionary) -> Self {
        self.cookies = cookies;
        self
    }

    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        is_client_error(self.status)
    }

    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        is_server_error(self.status)
    }

    /// # Errors
    ///
    /// `MalformedBody` when a non-empty JSON expectation does not parse.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.body.is_empty() {
            return Ok(());
        }
        if self.body_kind == ResponseBodyKind::Json {
            serde_json::from_str::<serde_json::Value>(&self.body)
                .map_err(|e| ModelError::MalformedBody(format!("failed to validate json: {e}")))?;
        }
        Ok(())
    }

    pub fn prettify(&mut self) {
        if self.body_kind == ResponseBodyKind::Json {
            prettify_json(&mut self.body);
        }
    }
}

#[must_use]
pub const fn is_client_error(status: u16) -> bool {
    status >= 400 && status < 500
}

#[must_use]
pub const fn is_server_error(status: u16) -> bool {
    status >= 500 && status < 600
}

fn prettify_json(text: &mut String) {
    if text.trim().is_empty() {
        return;
    }
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => {
            let mut out = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
            if value.serialize(&mut ser).is_ok() {
                if let Ok(pretty) = String::from_utf8(out) {
                    *text = pretty;
                }
            }
        }
        Err(e) => tracing::warn!("Failed to prettify json: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_request_validation() {
        let ok = HttpRequest::new(HttpMethod::Post).with_body(RequestBody::Json(r#"{"a":1}"#.into()));
        assert!(ok.validate().is_ok());

        let bad = HttpRequest::new(HttpMethod::Post).with_body(RequestBody::Json("{oops".into()));
        assert!(matches!(bad.validate(), Err(ModelError::MalformedBody(_))));

        let raw = HttpRequest::new(HttpMethod::Post).with_body(RequestBody::Raw("{oops".into()));
        assert!(raw.validate().is_ok());
    }

    #[test]
    fn delete_has_no_payload() {
        let req = HttpRequest::new(HttpMethod::Delete).with_body(RequestBody::Raw("x".into()));
        assert_eq!(req.payload(), None);
    }

    #[test]
    fn form_payload_uses_enabled_fields() {
        let fields = PartialDictionary::new(vec![
            crate::Element::enabled("user", "bob"),
            crate::Element::new("debug", "1", false),
        ]);
        let req = HttpRequest::new(HttpMethod::Post).with_body(RequestBody::Form(fields));
        match req.payload() {
            Some(BodyPayload::Fields(map)) => {
                assert_eq!(map.len(), 1);
                assert_eq!(map["user"], "bob");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn prettify_indents_with_four_spaces() {
        let mut req =
            HttpRequest::new(HttpMethod::Post).with_body(RequestBody::Json(r#"{"a":1}"#.into()));
        req.prettify();
        assert_eq!(req.body, RequestBody::Json("{\n    \"a\": 1\n}".into()));
    }

    #[test]
    fn authored_and_observed_json_share_one_layout() {
        let expected = HttpResponse::expect(200).with_body(ResponseBodyKind::Json, r#"{ "ok" : true }"#);
        let observed = HttpResponse::observed(
            200,
            r#"{"ok":true}"#.into(),
            PartialDictionary::default(),
            PartialDictionary::default(),
        );
        assert_eq!(expected.body, observed.body);
    }

    #[test]
    fn prettify_leaves_invalid_json() {
        let mut resp = HttpResponse::expect(200).with_body(ResponseBodyKind::Json, "{nope");
        resp.prettify();
        assert_eq!(resp.body, "{nope");
    }

    #[test]
    fn observed_body_kind_inference() {
        let json = HttpResponse::observed(
            200,
            r#"{"ok":true}"#.into(),
            PartialDictionary::default(),
            PartialDictionary::default(),
        );
        assert_eq!(json.body_kind, ResponseBodyKind::Json);
        assert_eq!(json.body, "{\n    \"ok\": true\n}");

        let html = HttpResponse::observed(
            200,
            "<html>ok</html>".into(),
            PartialDictionary::default(),
            PartialDictionary::default(),
        );
        assert_eq!(html.body_kind, ResponseBodyKind::Html);
    }

    #[test]
    fn empty_expectation_always_valid() {
        assert!(HttpResponse::expect(204).validate().is_ok());
        let bad = HttpResponse::expect(200).with_body(ResponseBodyKind::Json, "<html>");
        assert!(bad.validate().is_err());
        let html = HttpResponse::expect(200).with_body(ResponseBodyKind::Html, "<html>");
        assert!(html.validate().is_ok());
    }

    #[test]
    fn status_classes() {
        assert!(is_client_error(404));
        assert!(!is_client_error(500));
        assert!(is_server_error(503));
        assert!(!is_server_error(200));
    }

    #[test]
    fn method_parsing() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert!("PATCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn body_serializes_tagged() {
        let body = RequestBody::Raw("hello".into());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "raw", "content": "hello"}));
    }
}
