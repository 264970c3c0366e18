//! Conversational agents
//!
//! An agent reads the shared history, talks to its LLM, may call its own
//! capabilities along the way, and answers with exactly one utterance.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::agent::history::ConversationHistory;
use crate::core::{DeskError, Message, Result, Speaker, ToolDefinition, Utterance};
use crate::llm::{GenerateOptions, LLMProvider, LLMResponse};
use crate::tools::CapabilityRegistry;

/// A participant in the group chat
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique name within the roster
    fn name(&self) -> &str;

    /// Take one turn over the current history
    async fn act(&self, history: &ConversationHistory) -> Result<Utterance>;
}

/// LLM-backed agent with its own instructions and capabilities
#[derive(Clone)]
pub struct ChatAgent {
    name: String,
    instructions: String,
    capabilities: Arc<CapabilityRegistry>,
    llm: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    history_window: Option<usize>,
    max_tool_rounds: usize,
}

/// Builder for creating ChatAgents
pub struct ChatAgentBuilder {
    name: String,
    instructions: Option<String>,
    capabilities: CapabilityRegistry,
    llm: Option<Arc<dyn LLMProvider>>,
    model: Option<String>,
    temperature: f32,
    history_window: Option<usize>,
    max_tool_rounds: usize,
}

impl ChatAgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: None,
            capabilities: CapabilityRegistry::new(),
            llm: None,
            model: None,
            temperature: 0.3,
            history_window: None,
            max_tool_rounds: 4,
        }
    }

    /// Set the system instructions
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Capabilities this agent may call
    pub fn capabilities(mut self, capabilities: CapabilityRegistry) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Limit how much history the agent sees (None = everything)
    pub fn history_window(mut self, window: Option<usize>) -> Self {
        self.history_window = window;
        self
    }

    /// Tool exchanges allowed within a single turn
    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Build the ChatAgent
    pub fn build(self) -> Result<ChatAgent> {
        let llm = self
            .llm
            .ok_or_else(|| DeskError::config(format!("agent '{}' has no LLM provider", self.name)))?;
        let model = self
            .model
            .ok_or_else(|| DeskError::config(format!("agent '{}' has no model", self.name)))?;

        if self.name.trim().is_empty() {
            return Err(DeskError::config("agent name must not be empty"));
        }

        Ok(ChatAgent {
            instructions: self.instructions.unwrap_or_else(|| {
                format!("You are '{}'. Help the customer with their request.", self.name)
            }),
            name: self.name,
            capabilities: Arc::new(self.capabilities),
            llm,
            model,
            temperature: self.temperature,
            history_window: self.history_window,
            max_tool_rounds: self.max_tool_rounds,
        })
    }
}

impl ChatAgent {
    pub fn builder(name: impl Into<String>) -> ChatAgentBuilder {
        ChatAgentBuilder::new(name)
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    /// Prompt for this agent: instructions followed by the visible history
    fn build_messages(&self, history: &ConversationHistory) -> Vec<Message> {
        let visible = history.window_or_all(self.history_window);
        let mut messages = Vec::with_capacity(visible.len() + 1);
        messages.push(Message::system(&self.instructions));

        for utterance in visible {
            let message = match &utterance.speaker {
                Speaker::User => Message::user(&utterance.content),
                Speaker::Agent(name) if *name == self.name => Message::assistant(&utterance.content),
                Speaker::Agent(name) => {
                    Message::assistant(format!("[{}] {}", name, utterance.content))
                }
            };
            messages.push(message);
        }

        messages
    }

    async fn call_llm(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LLMResponse> {
        let options = Some(GenerateOptions::with_temperature(self.temperature));
        let response = if tools.is_empty() {
            self.llm.chat(&self.model, messages, options).await
        } else {
            self.llm
                .chat_with_tools(&self.model, messages, tools, options)
                .await
        };

        response.map_err(|e| DeskError::agent(&self.name, e.to_string()))
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn act(&self, history: &ConversationHistory) -> Result<Utterance> {
        let mut messages = self.build_messages(history);
        let tools = self.capabilities.definitions();

        for round in 0..=self.max_tool_rounds {
            let response = self.call_llm(&messages, &tools).await?;

            if response.tool_calls.is_empty() {
                let content = response.content.trim();
                if content.is_empty() {
                    return Err(DeskError::agent(&self.name, "model returned an empty answer"));
                }
                debug!(agent = %self.name, tool_rounds = round, "turn complete");
                return Ok(Utterance::agent(&self.name, content));
            }

            if round == self.max_tool_rounds {
                break;
            }

            let calls = response.tool_calls;
            messages.push(Message::assistant_with_tools(response.content, calls.clone()));

            for call in &calls {
                let result = self.capabilities.execute(call);
                info!(
                    agent = %self.name,
                    tool = %call.name,
                    success = result.success,
                    "capability invoked"
                );
                messages.push(Message::tool(&call.name, result.output));
            }
        }

        Err(DeskError::agent(
            &self.name,
            format!(
                "still calling tools after {} rounds",
                self.max_tool_rounds
            ),
        ))
    }
}
