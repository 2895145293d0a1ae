//! Severity levels for probe outcomes
//!
//! Total order drives both minimum-severity filtering and the CLI exit code.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Outcome severity, ordered `Ok < Warning < Danger < Critical`
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Response matched the contract
    #[default]
    Ok,
    /// Probe could not run meaningfully (connection refused, unfuzzable method)
    Warning,
    /// Contract drift: status, cookies or headers differ
    Danger,
    /// Server errors, leaked error text, wrong body, timeouts
    Critical,
}

impl Severity {
    /// All levels in ascending order
    pub const ALL: [Self; 4] = [Self::Ok, Self::Warning, Self::Danger, Self::Critical];

    /// Numeric rank (0..=3)
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Convert the worst severity of a run to an exit code
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Ok | Self::Warning => 0,
            Self::Danger => 1,
            Self::Critical => 2,
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::Warning => "Warning",
            Self::Danger => "Danger",
            Self::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown severity '{s}' (ok, warning, danger, critical)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Danger);
        assert!(Severity::Danger < Severity::Critical);
        assert_eq!(Severity::Critical.rank(), 3);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Severity::Ok.exit_code(), 0);
        assert_eq!(Severity::Warning.exit_code(), 0);
        assert_eq!(Severity::Danger.exit_code(), 1);
        assert_eq!(Severity::Critical.exit_code(), 2);
    }

    #[test]
    fn severity_serialization() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");

        let parsed: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, Severity::Warning);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("DANGER".parse::<Severity>(), Ok(Severity::Danger));
        assert_eq!("ok".parse::<Severity>(), Ok(Severity::Ok));
        assert!("fatal".parse::<Severity>().is_err());
    }
}
