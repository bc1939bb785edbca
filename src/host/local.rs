//! In-process host backed by the JSON store and the network backends.

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::protocol::{Request, Response};
use super::store::Store;
use super::{AnswerAck, Host, HostError};
use crate::error::EngineError;
use crate::gemini::TextGenerator;
use crate::session::{KnownQuestion, Profile, Settings};
use crate::sheets::SheetsLogger;
use crate::state_machine::OutcomeRecord;

pub struct LocalHost<G> {
    store: Store,
    store_path: Option<PathBuf>,
    generator: Option<G>,
    sheets: Option<SheetsLogger>,
    handled: BTreeMap<&'static str, usize>,
    outcomes: VecDeque<OutcomeRecord>,
    outcomes_logged: usize,
}

/// Outcome records kept in memory; older ones only live in the sheet.
pub const RECENT_OUTCOMES: usize = 100;

impl<G: TextGenerator> LocalHost<G> {
    /// Host over an in-memory store; nothing is written to disk.
    pub fn new(store: Store) -> Self {
        Self {
            store,
            store_path: None,
            generator: None,
            sheets: None,
            handled: BTreeMap::new(),
            outcomes: VecDeque::new(),
            outcomes_logged: 0,
        }
    }

    /// Host over the store at `path`, written back after every mutation.
    pub fn open(path: PathBuf) -> Result<Self, EngineError> {
        let store = Store::load(&path)?;
        Ok(Self {
            store_path: Some(path),
            ..Self::new(store)
        })
    }

    pub fn with_generator(mut self, generator: G) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_sheets(mut self, logger: SheetsLogger) -> Self {
        self.sheets = Some(logger);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn generator(&self) -> Option<&G> {
        self.generator.as_ref()
    }

    /// Number of handled requests with the given action tag.
    pub fn count(&self, action: &str) -> usize {
        self.handled.get(action).copied().unwrap_or(0)
    }

    /// The most recent outcome records, oldest first, at most [`RECENT_OUTCOMES`].
    pub fn outcomes(&self) -> &VecDeque<OutcomeRecord> {
        &self.outcomes
    }

    /// Outcome records received through `log-outcome` since the host was created.
    pub fn outcomes_logged(&self) -> usize {
        self.outcomes_logged
    }

    fn keep_outcome(&mut self, record: OutcomeRecord) {
        if self.outcomes.len() == RECENT_OUTCOMES {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(record);
        self.outcomes_logged += 1;
    }

    fn persist(&self) -> Result<(), EngineError> {
        match &self.store_path {
            Some(path) => self.store.save(path),
            None => Ok(()),
        }
    }

    pub async fn handle(&mut self, request: Request) -> Response {
        debug!(action = request.action(), "host request");
        *self.handled.entry(request.action()).or_default() += 1;

        match request {
            Request::FetchProfileAndSettings => Response::ProfileAndSettings {
                profile: self.store.profile.clone(),
                settings: self.store.settings.clone(),
            },
            Request::FetchKnownQuestions => Response::Questions {
                questions: self.store.questions.clone(),
            },
            Request::ReportNewQuestion { question } => {
                if self.store.add_question(&question) {
                    info!(%question, "stored new question");
                }
                self.persisted()
            }
            Request::ReportAnswer { question, answer } => {
                match self.store.set_answer(&question, &answer) {
                    AnswerAck::Stored => self.persisted(),
                    AnswerAck::NotFound => Response::NotFound,
                }
            }
            Request::RequestGeneratedText { prompt } => {
                let text = match &self.generator {
                    Some(generator) => match generator.generate(&prompt).await {
                        Ok(text) if !text.trim().is_empty() => Some(text),
                        Ok(_) => None,
                        Err(e) => {
                            warn!(error = %e, "text generation failed");
                            None
                        }
                    },
                    None => {
                        warn!("no text generator configured");
                        None
                    }
                };
                Response::GeneratedText { text }
            }
            Request::LogOutcome { record } => {
                info!(status = %record.status, job = %record.job_title, "outcome");
                let result = match &self.sheets {
                    Some(logger) => logger.append(&record).await,
                    None => Ok(()),
                };
                self.keep_outcome(record);
                match result {
                    Ok(()) => Response::Ack,
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                }
            }
            Request::SessionIdle { bot_id } => {
                info!(%bot_id, "session idle");
                Response::Ack
            }
        }
    }

    fn persisted(&self) -> Response {
        match self.persist() {
            Ok(()) => Response::Ack,
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        }
    }
}

fn unexpected(request: &str, response: Response) -> HostError {
    match response {
        Response::Error { message } => HostError::Rejected(message),
        other => HostError::UnexpectedResponse {
            request: request.to_string(),
            response: format!("{other:?}"),
        },
    }
}

impl<G: TextGenerator> Host for LocalHost<G> {
    async fn fetch_profile_and_settings(&mut self) -> Result<(Profile, Settings), HostError> {
        match self.handle(Request::FetchProfileAndSettings).await {
            Response::ProfileAndSettings { profile, settings } => Ok((profile, settings)),
            other => Err(unexpected("fetch-profile-and-settings", other)),
        }
    }

    async fn fetch_known_questions(&mut self) -> Result<Vec<KnownQuestion>, HostError> {
        match self.handle(Request::FetchKnownQuestions).await {
            Response::Questions { questions } => Ok(questions),
            other => Err(unexpected("fetch-known-questions", other)),
        }
    }

    async fn report_new_question(&mut self, question: &str) -> Result<(), HostError> {
        let request = Request::ReportNewQuestion {
            question: question.to_string(),
        };
        match self.handle(request).await {
            Response::Ack => Ok(()),
            other => Err(unexpected("report-new-question", other)),
        }
    }

    async fn report_answer(&mut self, question: &str, answer: &str) -> Result<AnswerAck, HostError> {
        let request = Request::ReportAnswer {
            question: question.to_string(),
            answer: answer.to_string(),
        };
        match self.handle(request).await {
            Response::Ack => Ok(AnswerAck::Stored),
            Response::NotFound => Ok(AnswerAck::NotFound),
            other => Err(unexpected("report-answer", other)),
        }
    }

    async fn request_generated_text(&mut self, prompt: &str) -> Option<String> {
        let request = Request::RequestGeneratedText {
            prompt: prompt.to_string(),
        };
        match self.handle(request).await {
            Response::GeneratedText { text } => text,
            _ => None,
        }
    }

    async fn log_outcome(&mut self, record: &OutcomeRecord) -> Result<(), HostError> {
        let request = Request::LogOutcome {
            record: record.clone(),
        };
        match self.handle(request).await {
            Response::Ack => Ok(()),
            other => Err(unexpected("log-outcome", other)),
        }
    }

    async fn session_idle(&mut self, bot_id: &str) {
        self.handle(Request::SessionIdle {
            bot_id: bot_id.to_string(),
        })
        .await;
    }
}
