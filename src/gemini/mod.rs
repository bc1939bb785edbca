pub mod client;
pub mod error;
pub mod types;

use std::sync::Mutex;

pub use client::GeminiClient;
pub use error::GeminiError;
pub use types::{GenerateRequest, GenerateResponse};

/// Backend for the `request-generated-text` message.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError>;
}

/// Generator with a fixed reply that records every prompt it receives.
///
/// Used by the offline demo and by tests; `None` behaves like an empty
/// model response.
#[derive(Debug, Default)]
pub struct CannedText {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl CannedText {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl TextGenerator for CannedText {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.reply.clone().ok_or(GeminiError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn canned_text_records_prompts() {
        let generator = CannedText::new("Dear hiring manager");
        assert_eq!(generator.generate("p1").await.unwrap(), "Dear hiring manager");
        assert!(CannedText::empty().generate("p2").await.is_err());
        assert_eq!(generator.prompts(), vec!["p1"]);
    }
}
