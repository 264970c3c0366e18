//! Termination policies
//!
//! A round stops when the policy says so or when the group chat hits its
//! iteration cap, whichever comes first.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::{render_transcript, ConversationHistory};
use crate::core::{DeskError, Message, Result};
use crate::llm::{GenerateOptions, LLMProvider};
use crate::policy::{strip_reasoning, TerminationPolicy, HISTORY_PLACEHOLDER};

/// Tokens that end a round: request finished, or waiting on the customer
pub const STOP_SENTINELS: [&str; 2] = ["<request_completed>", "<return_to_user>"];

fn contains_sentinel(text: &str, sentinels: &[String]) -> bool {
    let text = text.to_lowercase();
    sentinels.iter().any(|s| text.contains(s.as_str()))
}

fn default_sentinels() -> Vec<String> {
    STOP_SENTINELS.iter().map(|s| s.to_string()).collect()
}

/// Termination delegated to a judge prompt
///
/// An answer with neither sentinel means "keep going".
pub struct LlmTerminationPolicy {
    llm: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    prompt_template: String,
    sentinels: Vec<String>,
    window: usize,
}

impl LlmTerminationPolicy {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        prompt_template: impl Into<String>,
    ) -> Result<Self> {
        let prompt_template = prompt_template.into();
        if !prompt_template.contains(HISTORY_PLACEHOLDER) {
            return Err(DeskError::config(format!(
                "termination prompt is missing {}",
                HISTORY_PLACEHOLDER
            )));
        }

        Ok(Self {
            llm,
            model: model.into(),
            temperature: 0.0,
            prompt_template,
            sentinels: default_sentinels(),
            window: 1,
        })
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Whether a judge answer means "stop"
    pub fn is_stop_answer(&self, answer: &str) -> bool {
        contains_sentinel(strip_reasoning(answer), &self.sentinels)
    }
}

#[async_trait]
impl TerminationPolicy for LlmTerminationPolicy {
    async fn should_stop(&self, history: &ConversationHistory) -> Result<bool> {
        let prompt = self.prompt_template.replace(
            HISTORY_PLACEHOLDER,
            &render_transcript(history.windowed(self.window)),
        );

        let response = self
            .llm
            .chat(
                &self.model,
                &[Message::user(prompt)],
                Some(GenerateOptions::with_temperature(self.temperature)),
            )
            .await?;

        let stop = self.is_stop_answer(&response.content);
        debug!(answer = %response.content.trim(), stop, "termination answer");
        Ok(stop)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// Deterministic termination
///
/// Stops after an agent turn that comes from a terminal agent, carries a
/// sentinel, or ends with a question for the customer.
#[derive(Debug, Clone)]
pub struct RuleBasedTerminationPolicy {
    terminal_agents: HashSet<String>,
    sentinels: Vec<String>,
    stop_on_question: bool,
}

impl RuleBasedTerminationPolicy {
    pub fn new<I, S>(terminal_agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terminal_agents: terminal_agents.into_iter().map(Into::into).collect(),
            sentinels: default_sentinels(),
            stop_on_question: true,
        }
    }

    pub fn stop_on_question(mut self, enabled: bool) -> Self {
        self.stop_on_question = enabled;
        self
    }
}

#[async_trait]
impl TerminationPolicy for RuleBasedTerminationPolicy {
    async fn should_stop(&self, history: &ConversationHistory) -> Result<bool> {
        let Some(last) = history.last() else {
            return Ok(false);
        };
        let Some(agent) = last.agent_name() else {
            return Ok(false);
        };

        let content = last.content.trim_end();
        let stop = self.terminal_agents.contains(agent)
            || contains_sentinel(content, &self.sentinels)
            || (self.stop_on_question && (content.ends_with('?') || content.ends_with('？')));

        Ok(stop)
    }

    fn name(&self) -> &str {
        "rules"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Utterance;
    use crate::llm::ScriptedProvider;

    fn history_ending_with(utterance: Utterance) -> ConversationHistory {
        let mut history = ConversationHistory::new();
        history.append(Utterance::user("住所を変更したい"));
        history.append(utterance);
        history
    }

    fn judge(script: Arc<ScriptedProvider>) -> LlmTerminationPolicy {
        LlmTerminationPolicy::new(script, "m", "judge\n{{history}}").unwrap()
    }

    #[tokio::test]
    async fn test_llm_sentinels_stop() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_text("<request_completed>");
        script.push_text("<RETURN_TO_USER>");
        let policy = judge(script);
        let history = history_ending_with(Utterance::agent("Receptionist", "x"));

        assert!(policy.should_stop(&history).await.unwrap());
        assert!(policy.should_stop(&history).await.unwrap());
    }

    #[tokio::test]
    async fn test_llm_ambiguous_answer_continues() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_text("The agents should keep working.");
        let policy = judge(script);
        let history = history_ending_with(Utterance::agent("Receptionist", "x"));

        assert!(!policy.should_stop(&history).await.unwrap());
    }

    #[tokio::test]
    async fn test_llm_prompt_uses_window() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_text("<return_to_user>");
        let policy = judge(script.clone());
        let history = history_ending_with(Utterance::agent("Receptionist", "カード番号は？"));

        policy.should_stop(&history).await.unwrap();
        let prompt = &script.requests()[0].messages[0].content;
        assert!(prompt.ends_with("Receptionist: カード番号は？"));
        assert!(!prompt.contains("住所を変更したい"));
    }

    #[tokio::test]
    async fn test_llm_provider_failure_propagates() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_error("down");
        let policy = judge(script);
        let history = history_ending_with(Utterance::agent("Receptionist", "x"));

        assert!(policy.should_stop(&history).await.is_err());
    }

    #[tokio::test]
    async fn test_rules() {
        let policy = RuleBasedTerminationPolicy::new(["OtherTaskOperator"]);

        let terminal = history_ending_with(Utterance::agent("OtherTaskOperator", "おやすみなさい"));
        assert!(policy.should_stop(&terminal).await.unwrap());

        let question = history_ending_with(Utterance::agent("Receptionist", "カード番号を教えてください？"));
        assert!(policy.should_stop(&question).await.unwrap());

        let handoff = history_ending_with(Utterance::agent("Receptionist", "担当者にお繋ぎします。"));
        assert!(!policy.should_stop(&handoff).await.unwrap());

        let user_last = history_ending_with(Utterance::user("もしもし?"));
        assert!(!policy.should_stop(&user_last).await.unwrap());
    }

    #[tokio::test]
    async fn test_rules_question_detection_can_be_disabled() {
        let policy = RuleBasedTerminationPolicy::new(Vec::<String>::new()).stop_on_question(false);
        let question = history_ending_with(Utterance::agent("Receptionist", "よろしいですか？"));
        assert!(!policy.should_stop(&question).await.unwrap());
    }
}
