//! Text-generation provider boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::{prelude::*, req::HttpClient, Error};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// JSON-schema output contract for a structured call.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: Value,
}

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System/developer instruction.
    pub instructions: String,
    /// User payload.
    pub input: String,
    /// Output contract; `None` for free text.
    pub schema: Option<OutputSchema>,
    pub temperature: f32,
}

/// External text-generation provider.
///
/// Implementations must bound every call with a request-level timeout and
/// never retry indefinitely. Callers never assume the returned text matches
/// the schema.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Model identifier recorded as provenance on stored signals.
    fn model(&self) -> &str;
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// OpenAI chat-completions client.
///
/// Constructed once at process start and handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(base_url, timeout, max_retries)?,
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

fn response_format(schema: &OutputSchema) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": schema.name,
            "strict": true,
            "schema": schema.schema,
        }
    })
}

/// First choice content from a chat-completions payload.
pub(crate) fn extract_content(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)?;
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| Error::generation("response contained no choices"))?;
    if let Some(refusal) = message.refusal {
        return Err(Error::generation(format!("model refused: {refusal}")));
    }
    message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::generation("response contained no text"))
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &request.input,
                },
            ],
            temperature: request.temperature,
            response_format: request.schema.as_ref().map(response_format),
        };
        let text = self
            .http_client
            .post_json(CHAT_COMPLETIONS_PATH, &body, Some(&self.api_key))
            .await?;
        let content = extract_content(&text)?;
        debug!(
            target: "macro_signals::narrative",
            model = %self.model,
            schema = request.schema.as_ref().map(|s| s.name).unwrap_or("text"),
            chars = content.len(),
            "Generation complete"
        );
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
