//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::matcher::{ErrorMatcher, MatcherError};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool size for independent runs
    pub workers: usize,

    /// How long `cancel` waits for in-flight probes, in milliseconds
    pub cancel_grace_ms: u64,

    /// Error phrase file (one phrase per line). Built-in list when unset.
    pub error_phrases: Option<PathBuf>,

    /// User-Agent sent with every probe
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 4,
            cancel_grace_ms: 2000,
            error_phrases: None,
            user_agent: format!("webprobe/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from default location (.webprobe.toml)
    ///
    /// # Errors
    ///
    /// Returns error if a candidate file exists but cannot be loaded
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".webprobe.toml", ".webprobe.json", "webprobe.config.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        // No config file, return default
        Ok(Self::default())
    }

    /// # Errors
    ///
    /// `workers = 0` is rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        Ok(())
    }

    #[must_use]
    pub const fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }

    /// Build the error phrase matcher this config selects.
    ///
    /// # Errors
    ///
    /// Returns error if the phrase file cannot be read or compiled.
    pub fn error_matcher(&self) -> Result<ErrorMatcher, MatcherError> {
        match &self.error_phrases {
            Some(path) => ErrorMatcher::from_file(path),
            None => ErrorMatcher::builtin(),
        }
    }

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# webprobe engine configuration

# Concurrent probes in independent mode
workers = 4

# Milliseconds to wait for in-flight probes after cancellation
cancel_grace_ms = 2000

# Error phrases scanned for in response bodies (one per line).
# Uses the built-in list when unset.
# error_phrases = "errors.txt"

# user_agent = "webprobe/0.1.0"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.cancel_grace(), Duration::from_secs(2));
        assert!(config.error_phrases.is_none());
        assert!(config.user_agent.starts_with("webprobe/"));
    }

    #[test]
    fn parse_toml_partial() {
        let toml = r#"
workers = 16
error_phrases = "phrases.txt"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.workers, 16);
        assert_eq!(config.error_phrases, Some(PathBuf::from("phrases.txt")));
        assert_eq!(config.cancel_grace_ms, 2000);
    }

    #[test]
    fn example_parses() {
        let config: Config = toml::from_str(Config::example()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{"workers": 2, "cancel_grace_ms": 10}"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.cancel_grace_ms, 10);
    }

    #[test]
    fn zero_workers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "workers = 0\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file() {
        let err = Config::load(Path::new("/nonexistent/webprobe.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }
}
