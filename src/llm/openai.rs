//! OpenAI-compatible chat-completions client
//!
//! Supports tool calling and `json_schema` structured output.
//! Uses a long-lived reqwest::Client for connection pooling.

use super::{ChatMessage, Completion, CompletionRequest, LanguageModel, ResponseFormat, ToolCall};
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

/// Reusable chat-completions client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(client: Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn from_config(client: Client, config: &AdvisorConfig) -> Self {
        Self::new(
            client,
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.model.clone(),
        )
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(message_to_wire).collect(),
            tools: (!request.tools.is_empty()).then(|| request.tools.clone()),
            response_format: request.response_format.as_ref().map(response_format_to_wire),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        if self.api_key.is_empty() {
            return Err(AdvisorError::LlmError(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request(&request);

        debug!(
            model = %self.model,
            messages = body.messages.len(),
            tools = request.tools.len(),
            structured = request.response_format.is_some(),
            "Calling chat completions"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completions request failed: {}", e);
                AdvisorError::LlmError(format!("Chat completions request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Chat completions error response: {}", error_text);
            return Err(AdvisorError::LlmError(format!(
                "Chat completions returned {}: {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completions response: {}", e);
            AdvisorError::LlmError(format!("Chat completions parse error: {}", e))
        })?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::LlmError("No choices in model response".to_string()))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(AdvisorError::LlmError(format!("Model refused: {}", refusal)));
        }

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: parse_arguments(tc.function.arguments),
            })
            .collect();

        info!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            tool_calls = tool_calls.len(),
            "Model response received"
        );

        Ok(Completion {
            content: choice.message.content,
            tool_calls,
        })
    }
}

/// Arguments arrive as a JSON-encoded string. Unparseable text is kept as a
/// string value so argument validation can report it.
fn parse_arguments(raw: String) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn message_to_wire(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::System(content) | ChatMessage::User(content) => json!({
            "role": message.role(),
            "content": content,
        }),
        ChatMessage::Assistant { content, tool_calls } if !tool_calls.is_empty() => {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string(),
                        }
                    })
                })
                .collect();
            json!({
                "role": "assistant",
                "content": content,
                "tool_calls": calls,
            })
        }
        ChatMessage::Assistant { content, .. } => json!({
            "role": "assistant",
            "content": content.clone().unwrap_or_default(),
        }),
        ChatMessage::Tool { tool_call_id, content } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": content,
        }),
    }
}

fn response_format_to_wire(format: &ResponseFormat) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": format.name,
            "schema": format.schema,
            "strict": true,
        }
    })
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}
