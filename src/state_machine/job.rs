use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tracks where a job is in its application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Initiated,
    Filling,
    AwaitingHuman,
    Submitted,
    Abandoned,
}

/// The status written to the outcome log when a job is finished with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Applied,
    SkippedActionUnavailable,
    SkippedByHuman,
    ApplicationError,
    SessionError,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Applied => write!(f, "Applied Successfully"),
            OutcomeStatus::SkippedActionUnavailable => write!(f, "Skipped - Action Unavailable"),
            OutcomeStatus::SkippedByHuman => write!(f, "Skipped - By Human"),
            OutcomeStatus::ApplicationError => write!(f, "Error during application"),
            OutcomeStatus::SessionError => write!(f, "Error"),
        }
    }
}

/// A single application target picked from the listing.
///
/// Lives only while the engine works on it; discarded once its outcome is logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub source_url: String,
    pub content_generated: bool,
    pub questions_answered: bool,
    /// Set once generation has been attempted, whatever its result.
    pub content_requested: bool,
    /// Next and review clicks made on this job's form.
    pub form_steps: u32,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(title: String, company: String, source_url: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            company,
            source_url,
            content_generated: false,
            questions_answered: false,
            content_requested: false,
            form_steps: 0,
            status: JobStatus::Initiated,
            created_at: Utc::now(),
        }
    }
}

/// One column of the append-only outcome log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogColumn {
    Timestamp,
    #[serde(rename = "Bot Name")]
    BotName,
    #[serde(rename = "Job Title")]
    JobTitle,
    Company,
    #[serde(rename = "Application URL")]
    ApplicationUrl,
    Status,
    #[serde(rename = "Error Message")]
    ErrorMessage,
    #[serde(rename = "Content Generated")]
    ContentGenerated,
    #[serde(rename = "Questions Answered")]
    QuestionsAnswered,
}

impl LogColumn {
    pub const DEFAULT_ORDER: [LogColumn; 9] = [
        LogColumn::Timestamp,
        LogColumn::BotName,
        LogColumn::JobTitle,
        LogColumn::Company,
        LogColumn::ApplicationUrl,
        LogColumn::Status,
        LogColumn::ErrorMessage,
        LogColumn::ContentGenerated,
        LogColumn::QuestionsAnswered,
    ];
}

/// Structured record sent through `log-outcome`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub timestamp: DateTime<Utc>,
    pub bot_name: String,
    pub job_title: String,
    pub company: String,
    pub application_url: String,
    pub status: OutcomeStatus,
    pub error: Option<String>,
    pub content_generated: bool,
    pub questions_answered: bool,
}

impl OutcomeRecord {
    /// Build a record for the given job, or a session-level record when no job is active.
    pub fn new(
        bot_name: &str,
        job: Option<&Job>,
        status: OutcomeStatus,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            bot_name: bot_name.to_string(),
            job_title: job.map(|j| j.title.clone()).unwrap_or_default(),
            company: job.map(|j| j.company.clone()).unwrap_or_default(),
            application_url: job.map(|j| j.source_url.clone()).unwrap_or_default(),
            status,
            error,
            content_generated: job.is_some_and(|j| j.content_generated),
            questions_answered: job.is_some_and(|j| j.questions_answered),
        }
    }

    /// Render the record as a spreadsheet row in the configured column order.
    pub fn row(&self, columns: &[LogColumn]) -> Vec<String> {
        let yes_no = |flag: bool| if flag { "Yes" } else { "No" }.to_string();
        columns
            .iter()
            .map(|column| match column {
                LogColumn::Timestamp => self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                LogColumn::BotName => self.bot_name.clone(),
                LogColumn::JobTitle => self.job_title.clone(),
                LogColumn::Company => self.company.clone(),
                LogColumn::ApplicationUrl => self.application_url.clone(),
                LogColumn::Status => self.status.to_string(),
                LogColumn::ErrorMessage => self.error.clone().unwrap_or_default(),
                LogColumn::ContentGenerated => yes_no(self.content_generated),
                LogColumn::QuestionsAnswered => yes_no(self.questions_answered),
            })
            .collect()
    }
}
