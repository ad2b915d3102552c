//! OpenAI-compatible chat-completion client.
//!
//! Targets the `/chat/completions` endpoint of any OpenAI-compatible
//! server — a local Ollama instance or a hosted router both work, the
//! only difference is the base URL and whether an API key is set.
//!
//! Decoding is deterministic (temperature 0); SQL generation should not
//! vary between identical requests.

use async_trait::async_trait;
use tracing::debug;

use crate::{ChatClient, ChatResponse, Message, ProviderError, Role, ToolCall, ToolDefinition};

const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

/// OpenAI-compatible client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
}

impl OpenAiConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            api_key: None,
            temperature: 0.0,
        }
    }

    /// Create config from `LLM_MODEL`, `LLM_BASE_URL`, and `LLM_API_KEY`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let model = std::env::var("LLM_MODEL")
            .map_err(|_| ProviderError::Api("LLM_MODEL not set".into()))?;
        let mut config = Self::new(model);
        if let Ok(base_url) = std::env::var("LLM_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.api_key = Some(key);
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// OpenAI-compatible API client.
pub struct OpenAiClient {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Build the JSON request body for the chat-completions API.
    fn build_request_body(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> serde_json::Value {
        let msgs: Vec<_> = messages
            .iter()
            .map(|msg| {
                // Tool results go back as user turns; the wire format has no
                // free-standing tool role without a call id to answer.
                let role = match msg.role {
                    Role::System => "system",
                    Role::User | Role::Tool => "user",
                    Role::Assistant => "assistant",
                };
                serde_json::json!({
                    "role": role,
                    "content": msg.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": msgs,
        });

        if !tools.is_empty() {
            let tool_defs: Vec<_> = tools
                .iter()
                .map(|tool| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        },
                    })
                })
                .collect();
            body["tools"] = serde_json::json!(tool_defs);
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse, ProviderError> {
        let message = &json["choices"][0]["message"];
        if message.is_null() {
            return Err(ProviderError::Parse("response has no choices".into()));
        }

        let content = message["content"].as_str().unwrap_or_default().to_string();

        let tool_calls = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| {
                        // Arguments arrive as a JSON-encoded string.
                        let arguments = call["function"]["arguments"]
                            .as_str()
                            .and_then(|raw| serde_json::from_str(raw).ok())
                            .unwrap_or(serde_json::Value::Null);
                        ToolCall {
                            id: call["id"].as_str().unwrap_or("").to_string(),
                            name: call["function"]["name"].as_str().unwrap_or("").to_string(),
                            arguments,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ChatResponse {
            content,
            tool_calls,
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn send_message(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, ProviderError> {
        let body = self.build_request_body(messages, tools);

        debug!(model = %self.config.model, tools = tools.len(), "chat completion request");

        let mut request = self
            .http
            .post(self.endpoint())
            .header("content-type", "application/json")
            .json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("HTTP {status}: {text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        self.parse_response(json)
    }
}
