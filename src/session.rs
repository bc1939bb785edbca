//! Session-local data: the profile, settings and known-question snapshot
//! fetched at `Initializing`, plus the bot that started the session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::state_machine::Job;

/// Free-form applicant record. Read-only to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(pub Map<String, Value>);

impl Profile {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A scalar field rendered as text; `None` for absent, null or structured values.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_default()
    }
}

/// User settings as stored by the configuration UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub gemini_api_key: String,
    pub google_sheet_link: String,
    pub google_sheet_api_key: String,
    pub selector_resilience: BTreeMap<String, String>,
    pub ai_cover_letter_prompt: String,
    pub ai_question_prompt: String,
}

/// A form question with its stored answer, keyed by exact text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownQuestion {
    pub id: Uuid,
    pub text: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub is_unresolved: bool,
}

impl KnownQuestion {
    pub fn unresolved(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            answer: String::new(),
            is_unresolved: true,
        }
    }

    pub fn answered(text: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            answer: answer.into(),
            is_unresolved: false,
        }
    }
}

/// Exact-text lookup; no trimming, no case folding.
pub fn lookup<'a>(questions: &'a [KnownQuestion], text: &str) -> Option<&'a KnownQuestion> {
    questions.iter().find(|q| q.text == text)
}

/// The bot that started a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotDescriptor {
    pub id: String,
    pub name: String,
    pub listing_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub current_job: Option<Job>,
    pub profile: Profile,
    pub settings: Settings,
    pub known_questions: Vec<KnownQuestion>,
}

impl SessionContext {
    /// Stored answer for `text`, if one exists and is non-empty.
    pub fn known_answer(&self, text: &str) -> Option<&str> {
        lookup(&self.known_questions, text)
            .map(|q| q.answer.as_str())
            .filter(|a| !a.is_empty())
    }

    /// Whether `text` is already in the snapshot (answered or not).
    pub fn is_known(&self, text: &str) -> bool {
        lookup(&self.known_questions, text).is_some()
    }

    pub fn record_question(&mut self, text: &str) {
        if !self.is_known(text) {
            self.known_questions.push(KnownQuestion::unresolved(text));
        }
    }

    pub fn record_answer(&mut self, text: &str, answer: &str) {
        match self.known_questions.iter_mut().find(|q| q.text == text) {
            Some(q) => {
                q.answer = answer.to_string();
                q.is_unresolved = false;
            }
            None => self
                .known_questions
                .push(KnownQuestion::answered(text, answer)),
        }
    }
}
