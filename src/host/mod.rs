//! The host collaborator: everything the engine asks of the outside world.
//!
//! The engine talks to its host only through [`Host`]. [`LocalHost`] answers
//! those calls from a JSON [`Store`] and the network backends by routing each
//! one through the wire [`Request`]/[`Response`] protocol.

pub mod local;
pub mod protocol;
pub mod registry;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::{KnownQuestion, Profile, Settings};
use crate::state_machine::OutcomeRecord;

pub use local::LocalHost;
pub use protocol::{Control, Request, Response};
pub use registry::{SessionHandle, SessionRegistry};
pub use store::Store;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("host rejected request: {0}")]
    Rejected(String),

    #[error("unexpected response to {request}: {response}")]
    UnexpectedResponse { request: String, response: String },
}

/// Result of `report-answer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerAck {
    Stored,
    NotFound,
}

#[allow(async_fn_in_trait)]
pub trait Host {
    async fn fetch_profile_and_settings(&mut self) -> Result<(Profile, Settings), HostError>;

    async fn fetch_known_questions(&mut self) -> Result<Vec<KnownQuestion>, HostError>;

    /// Store `question` with an empty answer, flagged unresolved.
    async fn report_new_question(&mut self, question: &str) -> Result<(), HostError>;

    async fn report_answer(&mut self, question: &str, answer: &str) -> Result<AnswerAck, HostError>;

    /// Generated text for `prompt`, or `None` on any failure or empty output.
    async fn request_generated_text(&mut self, prompt: &str) -> Option<String>;

    async fn log_outcome(&mut self, record: &OutcomeRecord) -> Result<(), HostError>;

    /// The session reached `Idle` and has nothing left to do.
    async fn session_idle(&mut self, bot_id: &str);
}
