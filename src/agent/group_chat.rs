//! Group chat orchestrator
//!
//! Runs one round per user message: select an agent, let it act, ask the
//! termination policy whether to hand control back, repeat. The iteration
//! cap bounds every round regardless of what the policies say.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::chat_agent::Agent;
use crate::agent::history::ConversationHistory;
use crate::agent::round_state::{RoundPhase, RoundState};
use crate::core::{DeskError, Result, RoundError, Utterance};
use crate::policy::{SelectionPolicy, TerminationPolicy};

/// Default cap on agent turns per round
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Builder for [`GroupChat`]
pub struct GroupChatBuilder {
    agents: Vec<Arc<dyn Agent>>,
    entry_agent: Option<String>,
    selection: Option<Box<dyn SelectionPolicy>>,
    termination: Option<Box<dyn TerminationPolicy>>,
    max_iterations: usize,
}

impl Default for GroupChatBuilder {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            entry_agent: None,
            selection: None,
            termination: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl GroupChatBuilder {
    /// Add an agent to the roster; order is preserved
    pub fn agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.push(agent);
        self
    }

    /// Agent that opens every round (defaults to the first one added)
    pub fn entry_agent(mut self, name: impl Into<String>) -> Self {
        self.entry_agent = Some(name.into());
        self
    }

    pub fn selection(mut self, policy: impl SelectionPolicy + 'static) -> Self {
        self.selection = Some(Box::new(policy));
        self
    }

    pub fn termination(mut self, policy: impl TerminationPolicy + 'static) -> Self {
        self.termination = Some(Box::new(policy));
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<GroupChat> {
        if self.agents.is_empty() {
            return Err(DeskError::config("group chat needs at least one agent"));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.name().to_string()) {
                return Err(DeskError::config(format!(
                    "duplicate agent name '{}'",
                    agent.name()
                )));
            }
        }

        let agent_names: Vec<String> = self.agents.iter().map(|a| a.name().to_string()).collect();
        let entry_agent = match self.entry_agent {
            Some(name) if seen.contains(&name) => name,
            Some(name) => {
                return Err(DeskError::config(format!(
                    "entry agent '{}' is not in the roster",
                    name
                )))
            }
            None => agent_names[0].clone(),
        };

        let selection = self
            .selection
            .ok_or_else(|| DeskError::config("group chat has no selection policy"))?;
        let termination = self
            .termination
            .ok_or_else(|| DeskError::config("group chat has no termination policy"))?;

        if self.max_iterations == 0 {
            return Err(DeskError::config("max_iterations must be greater than 0"));
        }

        Ok(GroupChat {
            agents: self.agents,
            agent_names,
            entry_agent,
            selection,
            termination,
            history: ConversationHistory::new(),
            state: RoundState::new(self.max_iterations),
        })
    }
}

/// A roster of agents sharing one conversation
pub struct GroupChat {
    agents: Vec<Arc<dyn Agent>>,
    agent_names: Vec<String>,
    entry_agent: String,
    selection: Box<dyn SelectionPolicy>,
    termination: Box<dyn TerminationPolicy>,
    history: ConversationHistory,
    state: RoundState,
}

impl GroupChat {
    pub fn builder() -> GroupChatBuilder {
        GroupChatBuilder::default()
    }

    /// Run one round for a user message
    ///
    /// Returns the agent utterances of this round in order. On failure the
    /// error carries whatever was produced before it; those utterances stay in
    /// the history and the chat accepts the next message.
    pub async fn submit(&mut self, text: &str) -> std::result::Result<Vec<Utterance>, RoundError> {
        self.submit_with_cancel(text, &CancellationToken::new()).await
    }

    /// Like [`GroupChat::submit`], abandoning the round once `cancel` fires
    pub async fn submit_with_cancel(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<Utterance>, RoundError> {
        self.history.append(Utterance::user(text));
        self.state.begin();
        info!(
            history_len = self.history.len(),
            max_iterations = self.state.max_iterations,
            "round started"
        );

        match self.run_round(cancel).await {
            Ok(()) => {
                let turns = self.state.iteration;
                let produced = self.state.finish();
                info!(turns, "round finished");
                Ok(produced)
            }
            Err(source) => {
                let produced = self.state.abort();
                warn!(error = %source, produced = produced.len(), "round aborted");
                Err(RoundError::new(produced, source))
            }
        }
    }

    async fn run_round(&mut self, cancel: &CancellationToken) -> Result<()> {
        while self.state.should_continue() {
            self.state.phase = RoundPhase::SelectingAgent;
            let agent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DeskError::Cancelled),
                agent = self.select_next() => agent?,
            };

            self.state.phase = RoundPhase::AgentActing;
            let utterance = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DeskError::Cancelled),
                result = agent.act(&self.history) => result.map_err(|e| match e {
                    e @ DeskError::AgentInvocation { .. } => e,
                    other => DeskError::agent(agent.name(), other.to_string()),
                })?,
            };

            if utterance.agent_name() != Some(agent.name()) {
                return Err(DeskError::agent(
                    agent.name(),
                    format!("answered as '{}'", utterance.speaker),
                ));
            }

            debug!(agent = agent.name(), iteration = self.state.iteration + 1, "agent spoke");
            self.history.append(utterance.clone());
            self.state.record_turn(agent.name(), utterance);

            self.state.phase = RoundPhase::EvaluatingTermination;
            let stop = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DeskError::Cancelled),
                stop = self.termination.should_stop(&self.history) => stop?,
            };
            if stop {
                self.state.is_complete = true;
            }
        }

        if !self.state.is_complete && self.state.cap_reached() {
            warn!(
                max_iterations = self.state.max_iterations,
                "iteration cap reached, returning control to user"
            );
        }

        Ok(())
    }

    async fn select_next(&self) -> Result<Arc<dyn Agent>> {
        let last = self.state.last_agent.as_deref();
        let name = self
            .selection
            .select_next(&self.history, &self.agent_names, last)
            .await
            .map_err(|e| match e {
                DeskError::PolicyParse { .. } | DeskError::Selection(_) | DeskError::Cancelled => e,
                other => DeskError::selection(other.to_string()),
            })?;

        if last == Some(name.as_str()) {
            return Err(DeskError::selection(format!(
                "'{}' cannot speak twice in a row",
                name
            )));
        }

        self.agents
            .iter()
            .find(|a| a.name() == name)
            .cloned()
            .ok_or_else(|| DeskError::selection(format!("unknown agent '{}'", name)))
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn agent_names(&self) -> &[String] {
        &self.agent_names
    }

    pub fn entry_agent(&self) -> &str {
        &self.entry_agent
    }

    pub fn phase(&self) -> RoundPhase {
        self.state.phase
    }

    /// Whether a round is wrapping up; always false once control is back
    /// with the user
    pub fn is_complete(&self) -> bool {
        self.state.is_complete
    }

    /// Whether the last round ended because the termination policy fired
    pub fn stopped_by_policy(&self) -> bool {
        self.state.stopped_by_policy
    }

    /// Agent turns taken in the current (or last) round
    pub fn iteration_count(&self) -> usize {
        self.state.iteration
    }

    pub fn max_iterations(&self) -> usize {
        self.state.max_iterations
    }

    /// Names of the policies in use, for status output
    pub fn policy_names(&self) -> (&str, &str) {
        (self.selection.name(), self.termination.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Route, RuleBasedSelectionPolicy, RuleBasedTerminationPolicy};
    use async_trait::async_trait;

    struct Echo(&'static str);

    #[async_trait]
    impl Agent for Echo {
        fn name(&self) -> &str {
            self.0
        }

        async fn act(&self, _history: &ConversationHistory) -> Result<Utterance> {
            Ok(Utterance::agent(self.0, format!("{} here.", self.0)))
        }
    }

    fn roster() -> GroupChatBuilder {
        GroupChat::builder()
            .agent(Arc::new(Echo("A")))
            .agent(Arc::new(Echo("B")))
            .selection(RuleBasedSelectionPolicy::new("A", vec![Route::new("B", ["b"])], "B"))
            .termination(RuleBasedTerminationPolicy::new(["B"]))
    }

    #[test]
    fn test_builder_rejects_bad_rosters() {
        let dup = GroupChat::builder()
            .agent(Arc::new(Echo("A")))
            .agent(Arc::new(Echo("A")))
            .selection(RuleBasedSelectionPolicy::new("A", vec![], "A"))
            .termination(RuleBasedTerminationPolicy::new(["A"]))
            .build();
        assert!(matches!(dup, Err(DeskError::Config(_))));

        let unknown_entry = roster().entry_agent("Z").build();
        assert!(matches!(unknown_entry, Err(DeskError::Config(_))));

        let no_policy = GroupChat::builder().agent(Arc::new(Echo("A"))).build();
        assert!(no_policy.is_err());
    }

    #[tokio::test]
    async fn test_round_routes_then_stops() {
        let mut chat = roster().build().unwrap();
        assert_eq!(chat.phase(), RoundPhase::Idle);
        assert_eq!(chat.entry_agent(), "A");

        let produced = chat.submit("b please").await.unwrap();
        let speakers: Vec<_> = produced.iter().filter_map(|u| u.agent_name()).collect();
        assert_eq!(speakers, vec!["A", "B"]);
        assert!(chat.stopped_by_policy());
        assert!(!chat.is_complete());
        assert_eq!(chat.phase(), RoundPhase::AwaitingUser);
        assert_eq!(chat.history().len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut chat = roster().build().unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let err = chat.submit_with_cancel("b", &token).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(err.produced.is_empty());
        assert_eq!(chat.history().len(), 1);
        assert_eq!(chat.phase(), RoundPhase::Idle);
    }
}
