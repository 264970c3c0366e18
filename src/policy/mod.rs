//! Turn policies
//!
//! Selection decides who speaks next; termination decides when a round hands
//! control back to the user. Each comes in an LLM-backed and a rule-based
//! flavour behind the same trait.

pub mod selection;
pub mod termination;

use async_trait::async_trait;

use crate::agent::ConversationHistory;
use crate::core::Result;

pub use selection::{LlmSelectionPolicy, Route, RuleBasedSelectionPolicy};
pub use termination::{LlmTerminationPolicy, RuleBasedTerminationPolicy, STOP_SENTINELS};

/// Placeholder replaced by the rendered history in policy prompts
pub const HISTORY_PLACEHOLDER: &str = "{{history}}";

/// Drop a leading `<think>...</think>` block emitted by reasoning models
pub fn strip_reasoning(answer: &str) -> &str {
    match answer.find("</think>") {
        Some(end) if answer.trim_start().starts_with("<think>") => &answer[end + "</think>".len()..],
        _ => answer,
    }
}

/// Chooses the next agent to act
#[async_trait]
pub trait SelectionPolicy: Send + Sync {
    /// Pick one of `candidates`. `last_agent` is `None` at the start of a round.
    async fn select_next(
        &self,
        history: &ConversationHistory,
        candidates: &[String],
        last_agent: Option<&str>,
    ) -> Result<String>;

    fn name(&self) -> &str;
}

/// Decides whether the current round should stop
#[async_trait]
pub trait TerminationPolicy: Send + Sync {
    async fn should_stop(&self, history: &ConversationHistory) -> Result<bool>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_reasoning() {
        assert_eq!(strip_reasoning("<think>hmm</think>Receptionist"), "Receptionist");
        assert_eq!(strip_reasoning("Receptionist"), "Receptionist");
        assert_eq!(strip_reasoning("<think>unterminated"), "<think>unterminated");
    }
}
