//! Language-model access
//!
//! The pipeline talks to the model only through [`LanguageModel`]:
//! - `openai`: client for OpenAI-compatible chat completion and embedding
//!   endpoints

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde_json::Value;

/// One system + user prompt pair sent to the model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no content")]
    EmptyResponse,
    #[error("invalid JSON from model: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} is not supported by this model")]
    Unsupported(&'static str),
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one chat completion and return the assistant text
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Embed each text as a vector, in input order
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Err(LlmError::Unsupported("embeddings"))
    }

    fn model_name(&self) -> &str;
}

/// Strip a surrounding markdown code fence from model output
///
/// Models often wrap JSON in ```` ```json ... ``` ````; anything else is
/// returned trimmed.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (e.g. "json") up to the first newline
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Decode model output as JSON after removing any code fence
pub fn parse_json(text: &str) -> Result<Value, LlmError> {
    Ok(serde_json::from_str(extract_json(text))?)
}
