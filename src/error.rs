use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Bot not found: {0}")]
    BotNotFound(String),

    #[error("Session already running for bot {0}")]
    SessionExists(String),

    #[error("Engine cannot start while in state {0}")]
    Busy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classifies everything that can go wrong during a session.
///
/// Only fatal kinds move the state machine to `Failed`; the rest are
/// absorbed where they happen and the session continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// Profile, settings or generation key absent at start.
    PreconditionMissing,
    /// A DOM primitive timed out; treated as "field absent".
    ElementNotFound,
    /// No navigation control and no success marker on the form.
    StuckForm,
    /// Text generation returned nothing; the field is left blank.
    GenerationFailure,
    /// The outcome log call failed; the record is lost.
    LoggingFailure,
}

impl FailureKind {
    pub fn is_fatal(self) -> bool {
        matches!(self, FailureKind::PreconditionMissing | FailureKind::StuckForm)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::PreconditionMissing => write!(f, "PreconditionMissing"),
            FailureKind::ElementNotFound => write!(f, "ElementNotFound"),
            FailureKind::StuckForm => write!(f, "StuckForm"),
            FailureKind::GenerationFailure => write!(f, "GenerationFailure"),
            FailureKind::LoggingFailure => write!(f, "LoggingFailure"),
        }
    }
}

/// A fatal failure together with the reason reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
