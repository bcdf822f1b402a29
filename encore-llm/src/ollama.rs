use crate::json::parse_json_object;
use crate::traits::{LlmClient, LlmResponse, LlmResult, OutputSchema};
use async_trait::async_trait;
use encore_http::{HttpClient, RequestOpts};
use serde::Deserialize;
use serde_json::{json, Map, Value};

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";

/// Ollama client for local model inference.
///
/// Expects a running Ollama server (see https://github.com/ollama/ollama).
pub struct OllamaClient {
    client: HttpClient,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

impl OllamaClient {
    pub fn new(client: HttpClient, model: String) -> Self {
        Self { client, model }
    }

    /// Names of the models already pulled on the server.
    pub async fn available_models(&self) -> LlmResult<Vec<String>> {
        let tags: TagsResponse = self
            .client
            .get_json("api/tags", RequestOpts::default())
            .await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn call(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        format: Option<&Value>,
    ) -> LlmResult<LlmResponse> {
        let mut options = Map::new();
        if let Some(temp) = temperature {
            options.insert("temperature".to_string(), json!(temp));
        }
        if let Some(max_tok) = max_tokens {
            options.insert("num_predict".to_string(), json!(max_tok));
        }

        let mut payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": options,
        });
        if let Some(system) = system_prompt {
            payload["system"] = json!(system);
        }
        if let Some(schema) = format {
            payload["format"] = schema.clone();
        }

        let resp: GenerateResponse = self
            .client
            .post_json("api/generate", &payload, RequestOpts::default())
            .await?;

        Ok(LlmResponse {
            text: resp.response,
            model: Some(self.model.clone()),
            tokens_used: resp.eval_count,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> LlmResult<LlmResponse> {
        self.call(prompt, system_prompt, max_tokens, temperature, None)
            .await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: &str,
        schema: &OutputSchema,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> LlmResult<Value> {
        let resp = self
            .call(
                prompt,
                Some(system_prompt),
                max_tokens,
                temperature,
                Some(&schema.schema),
            )
            .await?;
        parse_json_object(&resp.text)
    }

    async fn health_check(&self) -> LlmResult<bool> {
        match self.available_models().await {
            Ok(models) => {
                if !models.iter().any(|m| m == &self.model) {
                    tracing::warn!(
                        target: "llm",
                        model = %self.model,
                        "llm.model_not_pulled; run `ollama pull {}`",
                        self.model
                    );
                }
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(target: "llm", error = %e, "{OLLAMA_CONNECTION_ERROR}");
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
