//! LLM module - Language Model integrations
//!
//! Provider abstraction with an Ollama backend, a retrying wrapper, and a
//! scripted provider for offline runs.

pub mod ollama;
pub mod retry;
pub mod scripted;
pub mod traits;

pub use ollama::OllamaClient;
pub use retry::{RetryPolicy, RetryingProvider};
pub use scripted::{RecordedRequest, ScriptedProvider};
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
