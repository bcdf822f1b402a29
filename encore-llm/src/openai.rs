use crate::json::parse_json_object;
use crate::traits::{LlmClient, LlmError, LlmResponse, LlmResult, OutputSchema};
use async_trait::async_trait;
use encore_http::{Auth, HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ResponsesApiRequest<'a> {
    model: &'a str,
    input: &'a str,
    instructions: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    output: Vec<ResponseMessage>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

/// One element in the `output` array
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Vec<ResponseContent>,
}

/// One part of the message `content`
#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

impl OpenAiClient {
    pub fn new(client: HttpClient, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }

    async fn respond(
        &self,
        prompt: &str,
        instructions: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        text: Option<Value>,
    ) -> LlmResult<LlmResponse> {
        let req = ResponsesApiRequest {
            model: &self.model,
            input: prompt,
            instructions,
            temperature,
            max_output_tokens: max_tokens,
            text,
        };

        let resp: ResponsesApiResponse = self
            .client
            .post_json(
                "responses",
                &req,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.api_key)),
                    ..Default::default()
                },
            )
            .await?;

        let text = resp
            .output
            .iter()
            .flat_map(|msg| &msg.content)
            .find(|c| c.kind == "output_text")
            .map(|c| c.text.clone())
            .ok_or_else(|| LlmError::InvalidResponse("reply has no output_text".into()))?;

        Ok(LlmResponse {
            text,
            model: resp.model,
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> LlmResult<LlmResponse> {
        let instructions = system_prompt.unwrap_or("You are a precise assistant.");
        self.respond(prompt, instructions, max_tokens, temperature, None)
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
            "format": {
                "type": "json_schema",
                "name": schema.name,
                "schema": schema.schema,
                "strict": true,
            }
        });
        let resp = self
            .respond(prompt, system_prompt, max_tokens, temperature, Some(format))
            .await?;
        parse_json_object(&resp.text)
    }

    async fn health_check(&self) -> LlmResult<bool> {
        let listed: Result<Value, _> = self
            .client
            .get_json(
                "models",
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.api_key)),
                    ..Default::default()
                },
            )
            .await;
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
