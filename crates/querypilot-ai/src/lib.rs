//! LLM gateway for querypilot.
//!
//! Provides the chat-completion client trait, an OpenAI-compatible client
//! (works against Ollama and OpenRouter alike), and the fixed system
//! prompts for each agent phase. The gateway returns either a terminal
//! message or the list of tool invocations the model requested — running
//! those tools is the agent crate's job.

pub mod openai;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;

pub use openai::{OpenAiClient, OpenAiConfig};

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_message(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// Describes a callable tool to the model: name, human description, and a
/// JSON schema for its arguments. The same schema documents the argument
/// shape the registry's handler expects.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A model response: terminal when `tool_calls` is empty.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    Api(String),
    #[error("rate limited")]
    RateLimited,
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// A chat client bound to one fixed system instruction and one tool set.
///
/// Each agent phase owns a gateway; `invoke` always prepends the phase's
/// system prompt so callers only pass the conversation history.
pub struct Gateway {
    client: Arc<dyn ChatClient>,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
}

impl Gateway {
    pub fn new(
        client: Arc<dyn ChatClient>,
        system_prompt: impl Into<String>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
            tools,
        }
    }

    /// One gateway call: fixed system instruction, then the conversation.
    pub async fn invoke(&self, history: &[Message]) -> Result<ChatResponse, ProviderError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message {
            role: Role::System,
            content: self.system_prompt.clone(),
        });
        messages.extend_from_slice(history);
        self.client.send_message(&messages, &self.tools).await
    }
}
