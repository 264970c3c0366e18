//! Selection policies
//!
//! Both policies keep the same guarantees on their output: a fresh round
//! starts with the entry agent, nobody speaks twice in a row, specialists hand
//! back to the entry agent, and the entry agent routes by request type.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::{render_transcript, ConversationHistory};
use crate::core::{DeskError, Message, Result};
use crate::llm::{GenerateOptions, LLMProvider};
use crate::policy::{strip_reasoning, SelectionPolicy, HISTORY_PLACEHOLDER};

/// Keyword route from the entry agent to a specialist
#[derive(Debug, Clone)]
pub struct Route {
    pub agent: String,
    pub keywords: Vec<String>,
}

impl Route {
    pub fn new<I, S>(agent: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            agent: agent.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Deterministic selection by keyword classification
#[derive(Debug, Clone)]
pub struct RuleBasedSelectionPolicy {
    entry_agent: String,
    routes: Vec<Route>,
    fallback: String,
}

impl RuleBasedSelectionPolicy {
    pub fn new(entry_agent: impl Into<String>, routes: Vec<Route>, fallback: impl Into<String>) -> Self {
        Self {
            entry_agent: entry_agent.into(),
            routes,
            fallback: fallback.into(),
        }
    }

    /// Specialist for the newest user request that matches a route
    pub fn classify(&self, history: &ConversationHistory) -> &str {
        history
            .user_utterances_newest_first()
            .find_map(|u| self.routes.iter().find(|r| r.matches(&u.content)))
            .map(|r| r.agent.as_str())
            .unwrap_or(self.fallback.as_str())
    }
}

#[async_trait]
impl SelectionPolicy for RuleBasedSelectionPolicy {
    async fn select_next(
        &self,
        history: &ConversationHistory,
        candidates: &[String],
        last_agent: Option<&str>,
    ) -> Result<String> {
        let choice = match last_agent {
            None => self.entry_agent.as_str(),
            Some(last) if last != self.entry_agent => self.entry_agent.as_str(),
            Some(_) => self.classify(history),
        };

        if !candidates.iter().any(|c| c == choice) {
            return Err(DeskError::selection(format!(
                "rule selected '{}' which is not in the roster",
                choice
            )));
        }

        debug!(selected = choice, last = ?last_agent, "rule-based selection");
        Ok(choice.to_string())
    }

    fn name(&self) -> &str {
        "rules"
    }
}

/// Selection delegated to a classifier prompt
pub struct LlmSelectionPolicy {
    llm: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    prompt_template: String,
    entry_agent: String,
    window: usize,
}

impl LlmSelectionPolicy {
    /// `prompt_template` must contain the history placeholder
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        prompt_template: impl Into<String>,
        entry_agent: impl Into<String>,
    ) -> Result<Self> {
        let prompt_template = prompt_template.into();
        if !prompt_template.contains(HISTORY_PLACEHOLDER) {
            return Err(DeskError::config(format!(
                "selection prompt is missing {}",
                HISTORY_PLACEHOLDER
            )));
        }

        Ok(Self {
            llm,
            model: model.into(),
            temperature: 0.0,
            prompt_template,
            entry_agent: entry_agent.into(),
            window: 1,
        })
    }

    /// History entries rendered into the prompt
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn render_prompt(&self, history: &ConversationHistory) -> String {
        self.prompt_template.replace(
            HISTORY_PLACEHOLDER,
            &render_transcript(history.windowed(self.window)),
        )
    }
}

/// Find which candidate the model named
///
/// An exact answer wins; otherwise the earliest mention in the text (longest
/// name on ties).
pub fn parse_agent_name(answer: &str, candidates: &[String]) -> Option<String> {
    let cleaned = answer.trim().trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*' | '-' | '.' | '。' | '「' | '」')
    });

    if let Some(exact) = candidates.iter().find(|c| c.as_str() == cleaned) {
        return Some(exact.clone());
    }

    candidates
        .iter()
        .filter_map(|c| answer.find(c.as_str()).map(|pos| (pos, c)))
        .min_by_key(|(pos, c)| (*pos, std::cmp::Reverse(c.len())))
        .map(|(_, c)| c.clone())
}

#[async_trait]
impl SelectionPolicy for LlmSelectionPolicy {
    async fn select_next(
        &self,
        history: &ConversationHistory,
        candidates: &[String],
        last_agent: Option<&str>,
    ) -> Result<String> {
        // fresh round, or a specialist handing back
        let last = match last_agent {
            Some(last) if last == self.entry_agent => last,
            _ => return Ok(self.entry_agent.clone()),
        };

        let prompt = self.render_prompt(history);
        debug!(prompt = %prompt, "selection prompt");

        let response = self
            .llm
            .chat(
                &self.model,
                &[Message::user(prompt)],
                Some(GenerateOptions::with_temperature(self.temperature)),
            )
            .await
            .map_err(|e| DeskError::selection(format!("selection model call failed: {}", e)))?;

        let answer = strip_reasoning(&response.content);
        debug!(answer = %answer, "selection answer");

        match parse_agent_name(answer, candidates) {
            Some(name) if name != last => Ok(name),
            _ => Err(DeskError::PolicyParse {
                policy: "selection",
                response: response.content,
            }),
        }
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Utterance;
    use crate::llm::ScriptedProvider;

    const ENTRY: &str = "Receptionist";
    const ADDRESS: &str = "AddressUpdater";
    const OTHER: &str = "OtherTaskOperator";

    fn roster() -> Vec<String> {
        vec![ENTRY.to_string(), ADDRESS.to_string(), OTHER.to_string()]
    }

    fn rules() -> RuleBasedSelectionPolicy {
        RuleBasedSelectionPolicy::new(ENTRY, vec![Route::new(ADDRESS, ["住所", "address"])], OTHER)
    }

    fn history_with(user: &str) -> ConversationHistory {
        let mut history = ConversationHistory::new();
        history.append(Utterance::user(user));
        history
    }

    #[tokio::test]
    async fn test_fresh_round_starts_with_entry() {
        let policy = rules();
        let picked = policy
            .select_next(&history_with("住所を変更したい"), &roster(), None)
            .await
            .unwrap();
        assert_eq!(picked, ENTRY);
    }

    #[tokio::test]
    async fn test_entry_routes_by_request() {
        let policy = rules();
        let address = policy
            .select_next(&history_with("住所を変更したい"), &roster(), Some(ENTRY))
            .await
            .unwrap();
        assert_eq!(address, ADDRESS);

        let other = policy
            .select_next(&history_with("ローンの相談をしたい"), &roster(), Some(ENTRY))
            .await
            .unwrap();
        assert_eq!(other, OTHER);
    }

    #[tokio::test]
    async fn test_specialist_returns_to_entry() {
        let policy = rules();
        for specialist in [ADDRESS, OTHER] {
            let picked = policy
                .select_next(&history_with("住所"), &roster(), Some(specialist))
                .await
                .unwrap();
            assert_eq!(picked, ENTRY);
        }
    }

    #[test]
    fn test_classify_uses_newest_matching_request() {
        let mut history = history_with("住所を変更したい");
        history.append(Utterance::agent(ENTRY, "カード番号を教えてください？"));
        history.append(Utterance::user("1234"));
        assert_eq!(rules().classify(&history), ADDRESS);
    }

    #[test]
    fn test_parse_agent_name() {
        let names = roster();
        assert_eq!(parse_agent_name(" \"AddressUpdater\" ", &names).as_deref(), Some(ADDRESS));
        assert_eq!(
            parse_agent_name("次は OtherTaskOperator です。", &names).as_deref(),
            Some(OTHER)
        );
        assert_eq!(parse_agent_name("nobody", &names), None);
    }

    fn llm_policy(script: Arc<ScriptedProvider>) -> LlmSelectionPolicy {
        LlmSelectionPolicy::new(script, "m", "pick one\n{{history}}", ENTRY).unwrap()
    }

    #[tokio::test]
    async fn test_llm_policy_skips_model_on_fresh_round() {
        let script = Arc::new(ScriptedProvider::new());
        let policy = llm_policy(script.clone());
        let picked = policy
            .select_next(&history_with("hi"), &roster(), None)
            .await
            .unwrap();
        assert_eq!(picked, ENTRY);
        assert_eq!(script.request_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_policy_parses_answer_over_window() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_text("<think>address change</think>AddressUpdater");
        let policy = llm_policy(script.clone());

        let mut history = history_with("old request");
        history.append(Utterance::agent(ENTRY, "承知しました"));
        let picked = policy
            .select_next(&history, &roster(), Some(ENTRY))
            .await
            .unwrap();
        assert_eq!(picked, ADDRESS);

        let prompt = &script.requests()[0].messages[0].content;
        assert!(prompt.contains("Receptionist: 承知しました"));
        assert!(!prompt.contains("old request"));
    }

    #[tokio::test]
    async fn test_llm_policy_rejects_repeat_and_garbage() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_text("Receptionist");
        script.push_text("I am not sure");
        let policy = llm_policy(script);

        let repeat = policy
            .select_next(&history_with("x"), &roster(), Some(ENTRY))
            .await;
        assert!(matches!(repeat, Err(DeskError::PolicyParse { .. })));

        let garbage = policy
            .select_next(&history_with("x"), &roster(), Some(ENTRY))
            .await;
        assert!(matches!(garbage, Err(DeskError::PolicyParse { .. })));
    }

    #[tokio::test]
    async fn test_llm_policy_specialist_hands_back_to_entry() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_text(OTHER);
        let policy = llm_policy(script.clone());

        for specialist in [ADDRESS, OTHER] {
            let picked = policy
                .select_next(&history_with("x"), &roster(), Some(specialist))
                .await
                .unwrap();
            assert_eq!(picked, ENTRY);
        }
        assert_eq!(script.request_count(), 0);
        assert_eq!(script.pending(), 1);
    }

    #[tokio::test]
    async fn test_llm_policy_empty_answer_is_parse_error() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_text("");
        let policy = llm_policy(script);

        let result = policy
            .select_next(&history_with("x"), &roster(), Some(ENTRY))
            .await;
        assert!(matches!(result, Err(DeskError::PolicyParse { .. })));
    }

    #[tokio::test]
    async fn test_llm_policy_provider_failure_is_selection_error() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_error("boom");
        let policy = llm_policy(script);

        let result = policy
            .select_next(&history_with("x"), &roster(), Some(ENTRY))
            .await;
        assert!(matches!(result, Err(DeskError::Selection(_))));
    }

    #[test]
    fn test_template_requires_placeholder() {
        let script: Arc<dyn LLMProvider> = Arc::new(ScriptedProvider::new());
        assert!(LlmSelectionPolicy::new(script, "m", "no history here", ENTRY).is_err());
    }
}
