//! Bankdesk - Multi-Agent Banking Help Desk
//!
//! A group of LLM-backed agents shares one conversation with a customer. A
//! selection policy picks who speaks next, a termination policy decides when
//! control goes back to the customer, and an iteration cap bounds every round.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Provider abstraction with Ollama, retry and scripted backends
//! - **Tools**: Capability registry used by agents
//! - **Agent**: Agents, conversation history and the group chat loop
//! - **Policy**: Selection and termination policies
//! - **Banking**: The receptionist / address updater / other-task roster
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bankdesk::banking::{build_group_chat, StubDirectory};
//! use bankdesk::llm::OllamaClient;
//! use bankdesk::Config;
//!
//! #[tokio::main]
//! async fn main() -> bankdesk::Result<()> {
//!     let config = Config::load()?;
//!     let llm = Arc::new(OllamaClient::from_config(&config)?);
//!     let mut chat = build_group_chat(&config, llm, Arc::new(StubDirectory::new()))?;
//!
//!     match chat.submit("住所を変更したい").await {
//!         Ok(utterances) => println!("{}", bankdesk::cli::format_utterances(&utterances)),
//!         Err(e) => eprintln!("{}", bankdesk::cli::format_round_error(&e)),
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod banking;
pub mod cli;
pub mod core;
pub mod llm;
pub mod policy;
pub mod tools;

// Re-export commonly used items
pub use agent::{Agent, ConversationHistory, GroupChat, SessionManager};
pub use cli::Repl;
pub use core::{Config, DeskError, PolicyMode, Result, RoundError, Speaker, Utterance};
pub use policy::{SelectionPolicy, TerminationPolicy};
