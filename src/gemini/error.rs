//! Tipos de erro para o cliente da API Gemini.
//!
//! Define [`GeminiError`] com variantes para rate limiting, erros da API,
//! respostas sem texto e erros de rede.

use thiserror::Error;

/// Erros que podem ocorrer ao chamar `generateContent`.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// O servidor retornou HTTP 429.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Erro retornado pela API (ex.: 400 chave inválida, 500 erro interno).
    /// A mensagem vem de `error.message` no corpo quando presente.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// A resposta não trouxe texto em `candidates[0].content.parts[0]`.
    #[error("response contained no generated text")]
    EmptyResponse,

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}
