//! Verdict module - severity, dispatch failures, and probe results

mod dispatch;
mod result;
mod severity;

pub use dispatch::DispatchError;
pub use result::{ProbeKind, TestResult};
pub use severity::Severity;
