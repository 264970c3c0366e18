//! Round state management
//!
//! Per-round scratch state of the group chat turn loop. Reset at the start of
//! every user-driven round; only the conversation history outlives it.

use std::fmt;

use crate::core::Utterance;

/// Where the turn loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No round has run yet
    Idle,
    SelectingAgent,
    AgentActing,
    EvaluatingTermination,
    /// Round finished; waiting for the next user message
    AwaitingUser,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RoundPhase::Idle => "idle",
            RoundPhase::SelectingAgent => "selecting-agent",
            RoundPhase::AgentActing => "agent-acting",
            RoundPhase::EvaluatingTermination => "evaluating-termination",
            RoundPhase::AwaitingUser => "awaiting-user",
        };
        f.write_str(label)
    }
}

/// State of one round of agent turns
#[derive(Debug, Clone)]
pub struct RoundState {
    pub phase: RoundPhase,
    /// Agent turns taken this round
    pub iteration: usize,
    /// Maximum agent turns per round
    pub max_iterations: usize,
    /// Set once the termination policy fires; cleared when the round returns
    pub is_complete: bool,
    /// Whether the last round ended on the termination policy rather than the cap
    pub stopped_by_policy: bool,
    /// Agent that spoke last in this round
    pub last_agent: Option<String>,
    /// Utterances produced this round, in order
    pub produced: Vec<Utterance>,
}

impl RoundState {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            phase: RoundPhase::Idle,
            iteration: 0,
            max_iterations,
            is_complete: false,
            stopped_by_policy: false,
            last_agent: None,
            produced: Vec::new(),
        }
    }

    /// Reset scratch fields for a new user-driven round
    pub fn begin(&mut self) {
        self.phase = RoundPhase::SelectingAgent;
        self.iteration = 0;
        self.is_complete = false;
        self.stopped_by_policy = false;
        self.last_agent = None;
        self.produced.clear();
    }

    /// Check if the loop should run another agent turn
    pub fn should_continue(&self) -> bool {
        !self.is_complete && self.iteration < self.max_iterations
    }

    pub fn cap_reached(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    /// Record a completed agent turn
    pub fn record_turn(&mut self, agent: &str, utterance: Utterance) {
        self.last_agent = Some(agent.to_string());
        self.produced.push(utterance);
        self.iteration += 1;
    }

    /// End the round and hand back this round's utterances
    pub fn finish(&mut self) -> Vec<Utterance> {
        self.stopped_by_policy = self.is_complete;
        self.is_complete = false;
        self.phase = RoundPhase::AwaitingUser;
        std::mem::take(&mut self.produced)
    }

    /// Abort the round; the chat stays usable for the next one
    pub fn abort(&mut self) -> Vec<Utterance> {
        self.is_complete = false;
        self.phase = RoundPhase::Idle;
        std::mem::take(&mut self.produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_state_new() {
        let state = RoundState::new(50);
        assert_eq!(state.phase, RoundPhase::Idle);
        assert_eq!(state.iteration, 0);
        assert!(!state.is_complete);
        assert!(state.last_agent.is_none());
    }

    #[test]
    fn test_should_continue_until_cap() {
        let mut state = RoundState::new(2);
        state.begin();
        assert!(state.should_continue());

        state.record_turn("A", Utterance::agent("A", "1"));
        assert!(state.should_continue());

        state.record_turn("B", Utterance::agent("B", "2"));
        assert!(!state.should_continue());
        assert!(state.cap_reached());
    }

    #[test]
    fn test_begin_resets_scratch_state() {
        let mut state = RoundState::new(5);
        state.begin();
        state.record_turn("A", Utterance::agent("A", "1"));
        state.is_complete = true;
        let produced = state.finish();
        assert_eq!(produced.len(), 1);
        assert!(!state.is_complete);
        assert!(state.stopped_by_policy);
        assert_eq!(state.phase, RoundPhase::AwaitingUser);

        state.begin();
        assert!(!state.stopped_by_policy);
        assert_eq!(state.iteration, 0);
        assert!(state.last_agent.is_none());
        assert!(state.produced.is_empty());
    }

    #[test]
    fn test_finish_after_cap_is_not_a_policy_stop() {
        let mut state = RoundState::new(1);
        state.begin();
        state.record_turn("A", Utterance::agent("A", "1"));
        assert!(!state.should_continue());

        state.finish();
        assert!(!state.is_complete);
        assert!(!state.stopped_by_policy);
    }
}
