//! Persistent JSON document holding the profile, settings, questions and bots.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::AnswerAck;
use crate::error::EngineError;
use crate::session::{BotDescriptor, KnownQuestion, Profile, Settings, lookup};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub profile: Profile,
    pub settings: Settings,
    pub questions: Vec<KnownQuestion>,
    pub bots: Vec<BotDescriptor>,
}

impl Store {
    /// Load the store; a missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| EngineError::Store(format!("{}: {e}", path.display())))
    }

    /// Write via a sibling temp file so a crash never leaves half a document.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Add `text` as an unresolved question. Returns false if it already exists.
    pub fn add_question(&mut self, text: &str) -> bool {
        if lookup(&self.questions, text).is_some() {
            return false;
        }
        self.questions.push(KnownQuestion::unresolved(text));
        true
    }

    pub fn set_answer(&mut self, text: &str, answer: &str) -> AnswerAck {
        match self.questions.iter_mut().find(|q| q.text == text) {
            Some(q) => {
                q.answer = answer.to_string();
                q.is_unresolved = false;
                AnswerAck::Stored
            }
            None => AnswerAck::NotFound,
        }
    }

    pub fn bot(&self, id: &str) -> Option<&BotDescriptor> {
        self.bots.iter().find(|b| b.id == id)
    }

    /// Unresolved questions first, each group in insertion order.
    pub fn questions_by_priority(&self) -> Vec<&KnownQuestion> {
        let mut questions: Vec<&KnownQuestion> = self.questions.iter().collect();
        questions.sort_by_key(|q| !q.is_unresolved);
        questions
    }
}
