//! Spreadsheet outcome logger: appends one row per [`OutcomeRecord`].

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::state_machine::{LogColumn, OutcomeRecord};

const API_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("sheet link or API key is not configured")]
    MissingCredentials,

    #[error("could not extract a spreadsheet id from {0}")]
    InvalidLink(String),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct AppendBody {
    values: Vec<Vec<String>>,
}

/// The id segment of a spreadsheet link (`…/spreadsheets/d/<id>/edit`).
pub fn spreadsheet_id(link: &str) -> Option<&str> {
    let (_, rest) = link.split_once("/d/")?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    let id = &rest[..end];
    (!id.is_empty()).then_some(id)
}

pub struct SheetsLogger {
    spreadsheet_id: String,
    api_key: String,
    sheet_name: String,
    columns: Vec<LogColumn>,
    client: Client,
    base_url: String,
}

impl SheetsLogger {
    pub fn new(
        link: &str,
        api_key: &str,
        sheet_name: &str,
        columns: Vec<LogColumn>,
    ) -> Result<Self, SheetsError> {
        Self::with_base_url(link, api_key, sheet_name, columns, API_URL.to_string())
    }

    pub fn with_base_url(
        link: &str,
        api_key: &str,
        sheet_name: &str,
        columns: Vec<LogColumn>,
        base_url: String,
    ) -> Result<Self, SheetsError> {
        if link.trim().is_empty() || api_key.trim().is_empty() {
            return Err(SheetsError::MissingCredentials);
        }
        let id = spreadsheet_id(link).ok_or_else(|| SheetsError::InvalidLink(link.to_string()))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Ok(Self {
            spreadsheet_id: id.to_string(),
            api_key: api_key.to_string(),
            sheet_name: sheet_name.to_string(),
            columns,
            client,
            base_url,
        })
    }

    pub fn spreadsheet(&self) -> &str {
        &self.spreadsheet_id
    }

    pub async fn append(&self, record: &OutcomeRecord) -> Result<(), SheetsError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.base_url.trim_end_matches('/'),
            self.spreadsheet_id,
            self.sheet_name
        );
        let body = AppendBody {
            values: vec![record.row(&self.columns)],
        };
        let response = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(SheetsError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
        debug!(status = %record.status, "appended outcome row");
        Ok(())
    }
}
