//! Error types for bankdesk
//!
//! One error enum for every layer, plus [`RoundError`] which carries the
//! utterances a failed round managed to produce.

use thiserror::Error;

use crate::core::types::Utterance;

/// Main error type for bankdesk operations
#[derive(Error, Debug)]
pub enum DeskError {
    /// LLM backend errors (connection, status, malformed body)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Model not available on the backend
    #[error("Model '{0}' not available. Run: ollama pull {0}")]
    ModelNotFound(String),

    /// An agent's turn could not produce an utterance
    #[error("Agent '{agent}' failed: {reason}")]
    AgentInvocation { agent: String, reason: String },

    /// No valid next agent could be determined
    #[error("Selection error: {0}")]
    Selection(String),

    /// A policy answer did not match the expected format
    #[error("{policy} policy could not parse response: {response:?}")]
    PolicyParse {
        policy: &'static str,
        response: String,
    },

    /// Capability execution errors
    #[error("Capability error: {0}")]
    Capability(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The round was cancelled by the caller
    #[error("Round cancelled")]
    Cancelled,

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for bankdesk operations
pub type Result<T> = std::result::Result<T, DeskError>;

impl DeskError {
    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create an agent invocation error
    pub fn agent(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AgentInvocation {
            agent: agent.into(),
            reason: reason.into(),
        }
    }

    /// Create a selection error
    pub fn selection(msg: impl Into<String>) -> Self {
        Self::Selection(msg.into())
    }

    /// Create a capability error
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Whether a failed LLM call is worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

/// A round that stopped early, with whatever it produced before failing
#[derive(Error, Debug)]
#[error("{source}")]
pub struct RoundError {
    /// Utterances appended to history before the failure
    pub produced: Vec<Utterance>,
    /// What went wrong
    #[source]
    pub source: DeskError,
}

impl RoundError {
    pub fn new(produced: Vec<Utterance>, source: DeskError) -> Self {
        Self { produced, source }
    }

    /// Whether the round was stopped by cancellation rather than a fault
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, DeskError::Cancelled)
    }
}
