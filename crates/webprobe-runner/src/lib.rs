//! webprobe-runner: probes and execution engine
//!
//! Dispatches requests through the [`HttpClient`] seam, classifies what comes
//! back, and runs whole workspaces either independently on a worker pool or
//! as a cookie-chained sequence.

pub mod client;
pub mod engine;
pub mod mutate;
pub mod probe;
pub mod wordlist;

pub use client::{HttpClient, LiveResponse, OutgoingRequest, ReqwestClient};
pub use engine::{
    Engine, EngineError, EngineState, ProbeTask, RunOutcome, TaskKind, next_cookie_state,
    plan_tasks,
};
pub use probe::{Prober, classify_match, classify_mutation};
pub use wordlist::{WordlistCache, WordlistError};
