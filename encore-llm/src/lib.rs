//! Provider-agnostic model integration for Encore.
//!
//! This crate exposes a common [`traits::LlmClient`] interface, concrete
//! provider implementations for Mistral, OpenAI, and Ollama, and the
//! [`extractor::LlmEventExtractor`] that turns page text into an
//! [`encore_common::Event`].
//!
//! # Examples
//! ```no_run
//! use encore_config::{LlmConfig, LlmProvider};
//! use encore_llm::build_llm_client;
//!
//! # fn main() -> Result<(), encore_llm::traits::LlmError> {
//! let cfg = LlmConfig {
//!     provider: LlmProvider::Ollama,
//!     model: None,
//!     auth_token: None,
//!     endpoint: None,
//!     max_tokens: None,
//!     timeout_secs: None,
//!     max_retries: 0,
//! };
//! let client = build_llm_client(&cfg)?;
//! assert_eq!(client.model_name(), "llama3.2:3b");
//! # Ok(())
//! # }
//! ```
pub mod extractor;
pub mod json;
#[cfg(feature = "mistral")]
pub mod mistral;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod traits;

pub use extractor::{EventExtractor, LlmEventExtractor};

use encore_config::{LlmConfig, LlmProvider};
use encore_http::HttpClient;
#[cfg(feature = "mistral")]
use mistral::MistralClient;
#[cfg(feature = "ollama")]
use ollama::OllamaClient;
#[cfg(feature = "openai")]
use openai::OpenAiClient;
use std::sync::Arc;
use traits::{LlmClient, LlmError};

/// Build the client selected by `config`.
///
/// No network traffic happens here; call [`LlmClient::health_check`] to
/// probe the service.
pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let mut http = HttpClient::new(config.endpoint())
        .map_err(|e| LlmError::Config(format!("llm.endpoint {}: {e}", config.endpoint())))?
        .with_retries(config.max_retries);
    if let Some(timeout) = config.timeout() {
        http = http.with_timeout(timeout);
    }
    let model = config.model().to_string();

    let client: Arc<dyn LlmClient> = match config.provider {
        #[cfg(feature = "mistral")]
        LlmProvider::Mistral => Arc::new(MistralClient::new(http, token(config)?, model)),
        #[cfg(feature = "openai")]
        LlmProvider::Openai => Arc::new(OpenAiClient::new(http, token(config)?, model)),
        #[cfg(feature = "ollama")]
        LlmProvider::Ollama => Arc::new(OllamaClient::new(http, model)),
        #[allow(unreachable_patterns)]
        other => {
            return Err(LlmError::Config(format!(
                "LLM provider {other:?} not enabled in this build"
            )))
        }
    };

    tracing::info!(
        target: "llm",
        provider = ?config.provider,
        model = client.model_name(),
        endpoint = config.endpoint(),
        "llm.client_ready"
    );
    Ok(client)
}

#[cfg(any(feature = "mistral", feature = "openai"))]
fn token(config: &LlmConfig) -> Result<String, LlmError> {
    config
        .auth_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| LlmError::Config(format!("{:?} requires llm.auth_token", config.provider)))
}
