//! Ollama client implementation
//!
//! Talks to `/api/chat` (non-streaming, with tool calling) and `/api/tags`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Config, DeskError, Message, Result, ToolCall, ToolDefinition};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

/// Longest request/response body echoed into debug logs
const DEBUG_BODY_LIMIT: usize = 500;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<WireOptions>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

/// Ollama nests the call under `function`
#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    function: ToolCall,
}

#[derive(Debug, Default, Serialize)]
struct WireOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    model: String,
    message: WireMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.clone(),
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .flatten()
                .map(|call| WireToolCall {
                    function: call.clone(),
                })
                .collect(),
            tool_name: msg.tool_name.clone(),
        }
    }
}

impl From<GenerateOptions> for WireOptions {
    fn from(opts: GenerateOptions) -> Self {
        Self {
            temperature: opts.temperature,
            num_predict: opts.max_tokens,
            stop: opts.stop,
        }
    }
}

impl From<WireResponse> for LLMResponse {
    fn from(response: WireResponse) -> Self {
        let usage = response
            .prompt_eval_count
            .zip(response.eval_count)
            .map(|(prompt, completion)| TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            });

        LLMResponse {
            content: response.message.content,
            tool_calls: response
                .message
                .tool_calls
                .into_iter()
                .map(|call| call.function)
                .collect(),
            usage,
            model: response.model,
        }
    }
}

fn log_body(label: &str, body: &str) {
    let mut chars = body.chars();
    let shown: String = chars.by_ref().take(DEBUG_BODY_LIMIT).collect();
    let ellipsis = if chars.next().is_some() { "..." } else { "" };
    debug!(target: "bankdesk::ollama", "{} {}{}", label, shown, ellipsis);
}

impl OllamaClient {
    /// Create a client for the server named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(config.ollama_url(), config.ollama.timeout_secs)
    }

    /// Create a client with a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), DEFAULT_TIMEOUT_SECS)
    }

    fn build(base_url: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DeskError::with_context("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_error(&self, e: reqwest::Error) -> DeskError {
        if e.is_connect() {
            DeskError::provider(format!(
                "Cannot connect to Ollama at {}. Is it running?",
                self.base_url
            ))
        } else {
            DeskError::from(e)
        }
    }

    async fn post_chat(
        &self,
        model: &str,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let request = WireRequest {
            model,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools,
            options: options.map(WireOptions::from),
            stream: false,
        };
        log_body("chat request", &serde_json::to_string(&request)?);

        let response = self
            .client
            .post(self.endpoint("/api/chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        let body = response.text().await?;
        log_body("chat response", &body);

        if status == StatusCode::NOT_FOUND && body.contains("not found") {
            return Err(DeskError::ModelNotFound(model.to_string()));
        }
        if !status.is_success() {
            return Err(DeskError::provider(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let parsed: WireResponse = serde_json::from_str(&body)
            .map_err(|e| DeskError::provider(format!("Malformed chat response: {}", e)))?;
        Ok(parsed.into())
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.post_chat(model, messages, None, options).await
    }

    async fn chat_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.post_chat(model, messages, Some(tools), options).await
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        if !response.status().is_success() {
            return Err(DeskError::provider(format!(
                "Listing models failed with {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
