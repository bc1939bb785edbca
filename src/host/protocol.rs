//! Wire form of the host messages, tagged by `action`.

use serde::{Deserialize, Serialize};

use crate::session::{BotDescriptor, KnownQuestion, Profile, Settings};
use crate::state_machine::OutcomeRecord;

/// Engine → host requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Request {
    FetchProfileAndSettings,
    FetchKnownQuestions,
    ReportNewQuestion { question: String },
    ReportAnswer { question: String, answer: String },
    RequestGeneratedText { prompt: String },
    LogOutcome { record: OutcomeRecord },
    SessionIdle { bot_id: String },
}

impl Request {
    /// The `action` tag, for logs and error messages.
    pub fn action(&self) -> &'static str {
        match self {
            Request::FetchProfileAndSettings => "fetch-profile-and-settings",
            Request::FetchKnownQuestions => "fetch-known-questions",
            Request::ReportNewQuestion { .. } => "report-new-question",
            Request::ReportAnswer { .. } => "report-answer",
            Request::RequestGeneratedText { .. } => "request-generated-text",
            Request::LogOutcome { .. } => "log-outcome",
            Request::SessionIdle { .. } => "session-idle",
        }
    }
}

/// Host-side session control, handled by the [`SessionRegistry`](super::SessionRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Control {
    StartSession { bot: BotDescriptor },
    StopSession { bot_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Response {
    Ack,
    NotFound,
    ProfileAndSettings { profile: Profile, settings: Settings },
    Questions { questions: Vec<KnownQuestion> },
    GeneratedText { text: Option<String> },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_are_tagged_by_action() {
        let req = Request::ReportAnswer {
            question: "Why Rust?".into(),
            answer: "Speed".into(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "action": "report-answer", "question": "Why Rust?", "answer": "Speed" })
        );
        assert_eq!(
            serde_json::to_value(Request::FetchKnownQuestions).unwrap(),
            json!({ "action": "fetch-known-questions" })
        );
    }

    #[test]
    fn action_matches_serialized_tag() {
        let requests = [
            Request::FetchProfileAndSettings,
            Request::ReportNewQuestion { question: "q".into() },
            Request::RequestGeneratedText { prompt: "p".into() },
            Request::SessionIdle { bot_id: "b".into() },
        ];
        for req in requests {
            let value = serde_json::to_value(&req).unwrap();
            assert_eq!(value["action"], req.action());
        }
    }

    #[test]
    fn control_messages_parse() {
        let start: Control = serde_json::from_value(json!({
            "action": "start-session",
            "bot": { "id": "1", "name": "Rust jobs", "listingUrl": "https://jobs.example/search" }
        }))
        .unwrap();
        assert!(matches!(start, Control::StartSession { ref bot } if bot.id == "1"));

        let stop: Control =
            serde_json::from_value(json!({ "action": "stop-session", "botId": "1" })).unwrap();
        assert_eq!(stop, Control::StopSession { bot_id: "1".into() });
    }

    #[test]
    fn null_generated_text_round_trips() {
        let resp: Response =
            serde_json::from_value(json!({ "status": "generated-text", "text": null })).unwrap();
        assert_eq!(resp, Response::GeneratedText { text: None });
    }
}
