//! Human-in-the-Loop Gate.
//!
//! At most one question is pending at a time. Opening a second one is
//! rejected and leaves the pending question untouched.

use thiserror::Error;

use crate::dom::ElementId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    pub question: String,
    /// The form field the answer is typed into on resume.
    pub field: ElementId,
    /// Generated answer offered to the human, when suggestions are enabled.
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResolution {
    Answer(String),
    Skip,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("a question is already awaiting input: {0}")]
    AlreadyOpen(String),

    #[error("no question is awaiting input")]
    NotOpen,

    #[error("answer must not be empty")]
    EmptyAnswer,

    #[error("questions can only be raised while filling a form, not in {0}")]
    WrongState(String),
}

#[derive(Debug, Default)]
pub struct HumanGate {
    pending: Option<PendingQuestion>,
}

impl HumanGate {
    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingQuestion> {
        self.pending.as_ref()
    }

    pub fn open(&mut self, question: PendingQuestion) -> Result<(), GateError> {
        if let Some(current) = &self.pending {
            return Err(GateError::AlreadyOpen(current.question.clone()));
        }
        self.pending = Some(question);
        Ok(())
    }

    /// Close the gate with a resolution. An empty answer is refused and the
    /// gate stays open.
    pub fn resolve(
        &mut self,
        resolution: GateResolution,
    ) -> Result<(PendingQuestion, GateResolution), GateError> {
        if self.pending.is_none() {
            return Err(GateError::NotOpen);
        }
        let resolution = match resolution {
            GateResolution::Answer(answer) => {
                let answer = answer.trim();
                if answer.is_empty() {
                    return Err(GateError::EmptyAnswer);
                }
                GateResolution::Answer(answer.to_string())
            }
            GateResolution::Skip => GateResolution::Skip,
        };
        let pending = self.pending.take().ok_or(GateError::NotOpen)?;
        Ok((pending, resolution))
    }

    pub fn close(&mut self) {
        self.pending = None;
    }
}
