//! webprobe-core: Data model and classification taxonomy for endpoint probing
//!
//! Endpoint definitions, request/response value objects, the partial
//! key-value container, severities, result filters, the error phrase matcher,
//! and workspace persistence. No network I/O lives here.

pub mod config;
pub mod dict;
pub mod endpoint;
mod error;
pub mod filter;
pub mod http;
pub mod matcher;
pub mod report;
pub mod verdict;
pub mod workspace;

pub use config::{Config, ConfigError};
pub use dict::{Element, PartialDictionary};
pub use endpoint::{Endpoint, FuzzTest, Interaction, SqlInjectionTest};
pub use error::ModelError;
pub use filter::{EndpointFilter, TestResultFilter};
pub use http::{
    BodyPayload, HttpMethod, HttpRequest, HttpResponse, RequestBody, RequestBodyKind,
    ResponseBodyKind,
};
pub use matcher::{ErrorMatcher, MatcherError};
pub use report::{Summary, render_report};
pub use verdict::{DispatchError, ProbeKind, Severity, TestResult};
pub use workspace::{DynamicOptions, Workspace, WorkspaceError, generate_schema};
