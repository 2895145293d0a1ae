//! Endpoint definitions: target URL, contract and probe selection

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::ModelError;

/// Default per-endpoint wait, in seconds
pub const DEFAULT_MAX_WAIT_SECONDS: u64 = 10;

/// Default repetitions for fuzz and SQL-injection probes
pub const DEFAULT_PROBE_COUNT: u32 = 10;

/// Default SQL-injection payload list
pub const DEFAULT_SQLI_WORDLIST: &str = "wordlists/sql-injection.txt";

/// Request template paired with the response it should produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Interaction {
    pub request: HttpRequest,
    #[serde(default)]
    pub response: HttpResponse,
}

impl Interaction {
    #[must_use]
    pub fn new(request: HttpRequest, response: HttpResponse) -> Self {
        Self { request, response }
    }

    /// # Errors
    ///
    /// First failing check of the request, then the response.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.request.validate()?;
        self.response.validate()
    }
}

/// Randomized body fuzzing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FuzzTest {
    #[serde(default = "default_count")]
    pub count: u32,
}

impl Default for FuzzTest {
    fn default() -> Self {
        Self {
            count: DEFAULT_PROBE_COUNT,
        }
    }
}

/// SQL-injection payloads drawn from a wordlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SqlInjectionTest {
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_wordlist")]
    pub wordlist: PathBuf,
}

impl Default for SqlInjectionTest {
    fn default() -> Self {
        Self {
            count: DEFAULT_PROBE_COUNT,
            wordlist: default_wordlist(),
        }
    }
}

const fn default_count() -> u32 {
    DEFAULT_PROBE_COUNT
}

fn default_wordlist() -> PathBuf {
    PathBuf::from(DEFAULT_SQLI_WORDLIST)
}

const fn default_max_wait() -> u64 {
    DEFAULT_MAX_WAIT_SECONDS
}

const fn default_true() -> bool {
    true
}

/// One target under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Endpoint {
    pub url: String,
    #[serde(flatten)]
    pub interaction: Interaction,
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub match_test: bool,
    #[serde(default)]
    pub fuzz_test: Option<FuzzTest>,
    #[serde(default)]
    pub sql_injection_test: Option<SqlInjectionTest>,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(
            "https://example.com/some/action",
            Interaction::new(HttpRequest::new(HttpMethod::Get), HttpResponse::expect(200)),
        )
    }
}

impl Endpoint {
    /// Endpoint with match and fuzz probes enabled.
    #[must_use]
    pub fn new(url: impl Into<String>, interaction: Interaction) -> Self {
        Self {
            url: url.into(),
            interaction,
            max_wait_seconds: DEFAULT_MAX_WAIT_SECONDS,
            enabled: true,
            match_test: true,
            fuzz_test: Some(FuzzTest::default()),
            sql_injection_test: None,
        }
    }

    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.interaction.request.method
    }

    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.interaction.request
    }

    #[must_use]
    pub fn expected(&self) -> &HttpResponse {
        &self.interaction.response
    }

    /// `"GET https://…"`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method(), self.url)
    }

    /// Enabled probe kinds, e.g. `"Match, Fuzz, SQL"`.
    #[must_use]
    pub fn test_types(&self) -> String {
        let mut kinds = Vec::new();
        if self.match_test {
            kinds.push("Match");
        }
        if self.fuzz_test.is_some() {
            kinds.push("Fuzz");
        }
        if self.sql_injection_test.is_some() {
            kinds.push("SQL");
        }
        kinds.join(", ")
    }

    /// Number of probe runs this endpoint contributes to a test run.
    #[must_use]
    pub fn task_count(&self) -> usize {
        let mut n = usize::from(self.match_test);
        if let Some(fuzz) = &self.fuzz_test {
            n += fuzz.count as usize;
        }
        if let Some(sqli) = &self.sql_injection_test {
            n += sqli.count as usize;
        }
        n
    }

    /// # Errors
    ///
    /// Bad URL, no probe selected, zero probe count, or an invalid interaction.
    pub fn validate(&self) -> Result<(), ModelError> {
        let parsed = url::Url::parse(&self.url).map_err(|e| ModelError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ModelError::InvalidUrl {
                url: self.url.clone(),
                reason: "expected an http(s) url with a host".into(),
            });
        }

        if !self.match_test && self.fuzz_test.is_none() && self.sql_injection_test.is_none() {
            return Err(ModelError::NoProbeSelected);
        }
        if self.fuzz_test.as_ref().is_some_and(|f| f.count == 0) {
            return Err(ModelError::ZeroCount { probe: "fuzz" });
        }
        if self.sql_injection_test.as_ref().is_some_and(|s| s.count == 0) {
            return Err(ModelError::ZeroCount {
                probe: "sql injection",
            });
        }

        self.interaction.validate()
    }
}
