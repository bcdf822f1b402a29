use crate::json::parse_json_object;
use crate::traits::{LlmClient, LlmError, LlmResponse, LlmResult, OutputSchema};
use async_trait::async_trait;
use encore_http::{Auth, HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Client for the Mistral chat-completions API.
pub struct MistralClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Value,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

impl MistralClient {
    pub fn new(client: HttpClient, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }

    async fn chat(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        response_format: Option<Value>,
    ) -> LlmResult<LlmResponse> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let req = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
            response_format,
        };
        let resp: ChatResponse = self
            .client
            .post_json(
                "chat/completions",
                &req,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.api_key)),
                    ..Default::default()
                },
            )
            .await?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("reply has no choices".into()))?;
        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!(target: "llm", model = %self.model, "llm.reply_truncated");
        }

        Ok(LlmResponse {
            text: content_text(&choice.message.content),
            model: resp.model.or_else(|| Some(self.model.clone())),
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }
}

/// Message content is either a plain string or a list of typed chunks.
fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(chunks) => chunks
            .iter()
            .filter_map(|c| c.get("text").and_then(Value::as_str))
            .collect(),
        _ => String::new(),
    }
}

#[async_trait]
impl LlmClient for MistralClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> LlmResult<LlmResponse> {
        self.chat(prompt, system_prompt, max_tokens, temperature, None)
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
        let format = json!({
            "type": "json_schema",
            "json_schema": {
                "name": schema.name,
                "schema": schema.schema,
                "strict": true,
            }
        });
        let resp = self
            .chat(prompt, Some(system_prompt), max_tokens, temperature, Some(format))
            .await?;
        tracing::debug!(
            target: "llm",
            model = resp.model.as_deref().unwrap_or(&self.model),
            tokens = resp.tokens_used,
            "llm.structured.reply"
        );
        parse_json_object(&resp.text)
    }

    async fn health_check(&self) -> LlmResult<bool> {
        let listed: LlmResult<Value> = self
            .client
            .get_json(
                "models",
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.api_key)),
                    ..Default::default()
                },
            )
            .await
            .map_err(LlmError::from);
        match listed {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(target: "llm", error = %e, "llm.health_check_failed");
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
