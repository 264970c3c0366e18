//! Scripted provider
//!
//! Replays queued responses in order and records every request it receives.
//! Used for offline runs and for driving the turn loop deterministically in
//! tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::{DeskError, Message, Result, ToolCall, ToolDefinition};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse};

/// A request as seen by the scripted provider
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Names of the tools offered with the request
    pub tools: Vec<String>,
}

/// Deterministic provider that answers from a queue
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<LLMResponse>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer with `text` whenever the queue is empty
    pub fn with_fallback(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    /// Queue a full response
    pub fn push_response(&self, response: LLMResponse) {
        self.lock_replies().push_back(Ok(response));
    }

    /// Queue a plain text answer
    pub fn push_text(&self, text: impl Into<String>) {
        self.push_response(LLMResponse::text(text));
    }

    /// Queue an answer that requests one tool call
    pub fn push_tool_call(&self, name: impl Into<String>, arguments: serde_json::Value) {
        self.push_response(LLMResponse::tool_calls(vec![ToolCall::new(name, arguments)]));
    }

    /// Queue a transient provider failure
    pub fn push_error(&self, msg: impl Into<String>) {
        self.push_failure(DeskError::provider(msg));
    }

    /// Queue an arbitrary failure
    pub fn push_failure(&self, error: DeskError) {
        self.lock_replies().push_back(Err(error));
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Replies still queued
    pub fn pending(&self) -> usize {
        self.lock_replies().len()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<LLMResponse>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer(&self, model: &str, messages: &[Message], tools: &[ToolDefinition]) -> Result<LLMResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedRequest {
                model: model.to_string(),
                messages: messages.to_vec(),
                tools: tools.iter().map(|t| t.name().to_string()).collect(),
            });

        match self.lock_replies().pop_front() {
            Some(reply) => reply.map(|mut response| {
                if response.model.is_empty() {
                    response.model = model.to_string();
                }
                response
            }),
            None => match &self.fallback {
                Some(text) => Ok(LLMResponse {
                    content: text.clone(),
                    model: model.to_string(),
                    ..Default::default()
                }),
                None => Err(DeskError::Other("scripted provider has no replies left".into())),
            },
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.answer(model, messages, &[])
    }

    async fn chat_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.answer(model, messages, tools)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec!["scripted".to_string()])
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
