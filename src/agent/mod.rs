//! Agent module - agents, shared history and the group chat loop
//!
//! Contains the per-agent turn logic and the orchestrator that coordinates
//! agents through selection and termination policies.

pub mod chat_agent;
pub mod group_chat;
pub mod history;
pub mod round_state;
pub mod session;

pub use chat_agent::{Agent, ChatAgent, ChatAgentBuilder};
pub use group_chat::{GroupChat, GroupChatBuilder, DEFAULT_MAX_ITERATIONS};
pub use history::{render_transcript, ConversationHistory};
pub use round_state::{RoundPhase, RoundState};
pub use session::{ChatFactory, SessionManager};
