//! Language-model abstraction
//!
//! The agent talks to the model through the `LanguageModel` trait so the
//! orchestration loop can run against a real chat-completions endpoint or a
//! scripted model in tests.

use crate::error::AdvisorError;
use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod openai;
pub use openai::OpenAiClient;

/// A model-initiated request to run one named tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User(content.into())
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        ChatMessage::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            ChatMessage::System(_) => "system",
            ChatMessage::User(_) => "user",
            ChatMessage::Assistant { .. } => "assistant",
            ChatMessage::Tool { .. } => "tool",
        }
    }
}

/// Named JSON schema the model must answer with.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFormat {
    pub name: &'static str,
    pub schema: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Tool definitions in chat-completions `tools` format. Empty disables tool calling.
    pub tools: Vec<Value>,
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Assistant turn to append to the conversation history.
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::Assistant {
            content: self.content,
            tool_calls: self.tool_calls,
        }
    }

    /// Decode the content as a structured-output payload.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self
            .content
            .as_deref()
            .ok_or_else(|| AdvisorError::LlmError("Empty response from model".to_string()))?;

        serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
            AdvisorError::LlmError(format!(
                "Failed to parse structured response: {} | raw={}",
                e, raw
            ))
        })
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}

fn strip_code_fence(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
