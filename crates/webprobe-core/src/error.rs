//! Endpoint definition errors

/// Rejected endpoint definition. Never reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid endpoint url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("must select at least one type of testing")]
    NoProbeSelected,
    #[error("malformed body: {0}")]
    MalformedBody(String),
    #[error("unknown HTTP method '{0}'")]
    UnknownMethod(String),
    #[error("{probe} count must be at least 1")]
    ZeroCount { probe: &'static str },
}
