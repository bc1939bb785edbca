//! Automation engine for multi-step job-application flows.
//!
//! An [`Engine`](engine::Engine) drives one browsing context through a job
//! listing: it picks an unclaimed posting, opens its apply flow, fills each
//! form step from the user's profile and stored answers, asks a human when
//! it meets a question it cannot answer, and records an outcome per job.

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod fill;
pub mod gate;
pub mod gemini;
pub mod host;
pub mod prompt;
pub mod scan;
pub mod selectors;
pub mod session;
pub mod sheets;
pub mod state_machine;

pub use engine::{Engine, StopHandle};
pub use error::{EngineError, Failure, FailureKind};
