//! Workspace persistence: endpoints, last results and dynamic options
//!
//! Format is chosen by extension: `.json`, `.yaml`/`.yml`, otherwise TOML.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dict::PartialDictionary;
use crate::endpoint::Endpoint;
use crate::filter::EndpointFilter;
use crate::verdict::TestResult;
use crate::ModelError;

/// Session-chaining options. Presence on a workspace selects dynamic mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DynamicOptions {
    /// Seed the cookie state with `initial_cookies`
    #[serde(default)]
    pub use_initial_values: bool,
    #[serde(default)]
    pub initial_cookies: PartialDictionary,
}

impl DynamicOptions {
    /// Cookie state the first probe starts from.
    #[must_use]
    pub fn starting_cookies(&self) -> PartialDictionary {
        if self.use_initial_values {
            self.initial_cookies.clone()
        } else {
            PartialDictionary::default()
        }
    }
}

/// Everything a session saves and restores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Workspace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_options: Option<DynamicOptions>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub results: Vec<TestResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            _ => Self::Toml,
        }
    }
}

impl Workspace {
    #[must_use]
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints,
            ..Self::default()
        }
    }

    pub fn add_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoints.push(endpoint);
    }

    /// Remove the first endpoint equal to `endpoint`. Returns whether one was removed.
    pub fn remove_endpoint(&mut self, endpoint: &Endpoint) -> bool {
        match self.endpoints.iter().position(|e| e == endpoint) {
            Some(idx) => {
                self.endpoints.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn enabled_endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().filter(|e| e.enabled)
    }

    /// Endpoints visible under `filter` (all when `None`).
    #[must_use]
    pub fn filtered_endpoints(&self, filter: Option<&EndpointFilter>) -> Vec<&Endpoint> {
        match filter {
            Some(f) => f.apply(&self.endpoints),
            None => self.endpoints.iter().collect(),
        }
    }

    /// Validate every enabled endpoint, returning `(index, error)` for each failure.
    #[must_use]
    pub fn validate(&self) -> Vec<(usize, ModelError)> {
        self.endpoints
            .iter()
            .enumerate()
            .filter(|(_, e)| e.enabled)
            .filter_map(|(i, e)| e.validate().err().map(|err| (i, err)))
            .collect()
    }

    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, WorkspaceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WorkspaceError::Io(path.to_path_buf(), e.to_string()))?;
        let parsed = match Format::from_path(path) {
            Format::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
            Format::Yaml => serde_yml::from_str(&content).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
        };
        let mut workspace: Self =
            parsed.map_err(|e| WorkspaceError::Parse(path.to_path_buf(), e))?;
        // Expected JSON bodies compare against prettified live bodies
        for endpoint in &mut workspace.endpoints {
            endpoint.interaction.response.prettify();
        }
        tracing::info!(
            "Loaded workspace {} ({} endpoints, {} results)",
            path.display(),
            workspace.endpoints.len(),
            workspace.results.len()
        );
        Ok(workspace)
    }

    /// # Errors
    ///
    /// Returns error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), WorkspaceError> {
        let text = match Format::from_path(path) {
            Format::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
            Format::Yaml => serde_yml::to_string(self).map_err(|e| e.to_string()),
            Format::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
        }
        .map_err(WorkspaceError::Serialize)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| WorkspaceError::Io(parent.to_path_buf(), e.to_string()))?;
        }
        std::fs::write(path, text).map_err(|e| WorkspaceError::Io(path.to_path_buf(), e.to_string()))?;
        tracing::info!("Saved workspace to {}", path.display());
        Ok(())
    }

    /// Example workspace for `webprobe init`
    pub fn example() -> &'static str {
        r#"# webprobe workspace

# Uncomment to chain cookies between probes (dynamic mode)
# [dynamic_options]
# use_initial_values = true
# initial_cookies = [{ key = "lang", value = "en" }]

[[endpoints]]
url = "http://localhost:8080/login"
max_wait_seconds = 5
match_test = true

[endpoints.request]
method = "POST"

[endpoints.request.body]
kind = "form"
content = [
    { key = "user", value = "admin" },
    { key = "password", value = "admin" },
]

[endpoints.response]
status = 200
body_kind = "json"
cookies = [{ key = "session", value = "" }]

[endpoints.fuzz_test]
count = 10

[endpoints.sql_injection_test]
count = 10
wordlist = "wordlists/sql-injection.txt"

[[endpoints]]
url = "http://localhost:8080/profile"

[endpoints.request]
method = "GET"

[endpoints.response]
status = 200
body_kind = "json"
"#
    }
}

/// Generate JSON Schema for the workspace file format.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(Workspace);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Cannot access {0}: {1}")]
    Io(PathBuf, String),
    #[error("Cannot parse {0}: {1}")]
    Parse(PathBuf, String),
    #[error("Cannot serialize workspace: {0}")]
    Serialize(String),
}
