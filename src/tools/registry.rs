//! Capability registry - maps tool names to definitions and handlers
//!
//! Capabilities are plain synchronous functions registered under a name.
//! Each agent owns a registry holding only the capabilities it may call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::core::{Result, ToolCall, ToolDefinition, ToolResult};

/// Handler invoked when the model calls a capability
pub type CapabilityFn = Arc<dyn Fn(&ToolCall) -> Result<ToolResult> + Send + Sync>;

/// A registered capability
#[derive(Clone)]
pub struct Capability {
    pub definition: ToolDefinition,
    handler: CapabilityFn,
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.definition.function.name)
            .finish()
    }
}

/// Registry of capabilities available to one agent
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<String, Capability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability, replacing any previous one with the same name
    pub fn register<F>(&mut self, definition: ToolDefinition, handler: F)
    where
        F: Fn(&ToolCall) -> Result<ToolResult> + Send + Sync + 'static,
    {
        let name = definition.function.name.clone();
        self.capabilities.insert(
            name,
            Capability {
                definition,
                handler: Arc::new(handler),
            },
        );
    }

    /// Tool definitions to offer the model, in name order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.capabilities
            .values()
            .map(|c| c.definition.clone())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.capabilities.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Execute a tool call
    ///
    /// Unknown tools and handler errors come back as failed results so the
    /// model can see what went wrong.
    pub fn execute(&self, tool_call: &ToolCall) -> ToolResult {
        let Some(capability) = self.capabilities.get(&tool_call.name) else {
            return ToolResult::failure(
                &tool_call.name,
                format!("Unknown tool: {}", tool_call.name),
            );
        };

        debug!(tool = %tool_call.name, args = %tool_call.arguments, "executing capability");

        match (capability.handler)(tool_call) {
            Ok(result) => result,
            Err(e) => ToolResult::failure(&tool_call.name, e.to_string()),
        }
    }
}
