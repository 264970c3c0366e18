//! Conversation history
//!
//! Append-only log shared by every agent and both turn policies. Prompts see
//! a bounded window of it; the full log is kept for the lifetime of the
//! session.

use crate::core::{Speaker, Utterance};

/// Ordered, append-only conversation log
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    entries: Vec<Utterance>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an utterance
    pub fn append(&mut self, utterance: Utterance) {
        self.entries.push(utterance);
    }

    /// The most recent `n` entries, oldest first
    pub fn windowed(&self, n: usize) -> &[Utterance] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Window if `n` is set, otherwise the whole log
    pub fn window_or_all(&self, n: Option<usize>) -> &[Utterance] {
        match n {
            Some(n) => self.windowed(n),
            None => &self.entries,
        }
    }

    pub fn as_slice(&self) -> &[Utterance] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utterance> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Utterance> {
        self.entries.last()
    }

    /// User utterances, newest first
    pub fn user_utterances_newest_first(&self) -> impl Iterator<Item = &Utterance> {
        self.entries.iter().rev().filter(|u| u.speaker.is_user())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Render utterances as `speaker: content` lines for embedding in a prompt
pub fn render_transcript(entries: &[Utterance]) -> String {
    entries
        .iter()
        .map(|u| match &u.speaker {
            Speaker::User => format!("user: {}", u.content.trim()),
            Speaker::Agent(name) => format!("{}: {}", name, u.content.trim()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConversationHistory {
        let mut history = ConversationHistory::new();
        history.append(Utterance::user("1"));
        history.append(Utterance::agent("Receptionist", "2"));
        history.append(Utterance::user("3"));
        history.append(Utterance::agent("AddressUpdater", "4"));
        history
    }

    #[test]
    fn test_append_preserves_order() {
        let history = sample();
        let contents: Vec<_> = history.iter().map(|u| u.content.as_str()).collect();
        assert_eq!(contents, ["1", "2", "3", "4"]);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_windowed_keeps_most_recent_in_order() {
        let history = sample();
        let window = history.windowed(2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "3");
        assert_eq!(window[1].content, "4");
        // Underlying log untouched
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_windowed_larger_than_history() {
        let history = sample();
        assert_eq!(history.windowed(100).len(), 4);
        assert!(ConversationHistory::new().windowed(1).is_empty());
        assert!(history.windowed(0).is_empty());
    }

    #[test]
    fn test_user_utterances_newest_first() {
        let history = sample();
        let users: Vec<_> = history
            .user_utterances_newest_first()
            .map(|u| u.content.as_str())
            .collect();
        assert_eq!(users, ["3", "1"]);
    }

    #[test]
    fn test_render_transcript() {
        let history = sample();
        let text = render_transcript(history.windowed(2));
        assert_eq!(text, "user: 3\nAddressUpdater: 4");
    }
}
