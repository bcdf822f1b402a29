use crate::json::parse_json_object;
use async_trait::async_trait;
use encore_http::{HttpError, HttpStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub type LlmResult<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

/// A named JSON schema the reply must conform to.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Request could not be sent: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<HttpError> for LlmError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Api {
                status, message, ..
            } if status == HttpStatus::TOO_MANY_REQUESTS => Self::RateLimit(message),
            HttpError::Api {
                status, message, ..
            } => Self::Api {
                status: status.as_u16(),
                message,
            },
            HttpError::Timeout(after) => Self::Timeout(after),
            HttpError::Decode(err, snippet) => {
                Self::InvalidResponse(format!("{err}; body: {snippet}"))
            }
            HttpError::Url(msg) | HttpError::Build(msg) => Self::InvalidRequest(msg),
            HttpError::Network(msg) => Self::Network(msg),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a free-text response to the given prompt with an optional system prompt.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> LlmResult<LlmResponse>;

    /// Generate a JSON object conforming to `schema`.
    ///
    /// Providers with native schema-constrained decoding override this. The
    /// fallback embeds the schema in the system prompt and pulls the first
    /// JSON object out of the free-text reply.
    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: &str,
        schema: &OutputSchema,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> LlmResult<Value> {
        let system = format!(
            "{system_prompt}\n\nRespond with a single JSON object named `{}` that \
             conforms to this JSON schema and nothing else:\n{}",
            schema.name, schema.schema
        );
        let response = self
            .generate(prompt, Some(&system), max_tokens, temperature)
            .await?;
        parse_json_object(&response.text)
    }

    /// Check if the LLM service is reachable with the configured credentials.
    async fn health_check(&self) -> LlmResult<bool>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
