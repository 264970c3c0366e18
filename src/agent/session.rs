//! Session management
//!
//! One [`GroupChat`] per session id. Rounds within a session run one at a
//! time; separate sessions never share state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::agent::group_chat::GroupChat;
use crate::core::{Result, RoundError, Utterance};

/// Builds a fresh group chat for a new session
pub type ChatFactory = Arc<dyn Fn() -> Result<GroupChat> + Send + Sync>;

/// Owns the live sessions
pub struct SessionManager {
    factory: ChatFactory,
    sessions: Mutex<HashMap<String, Arc<Mutex<GroupChat>>>>,
}

impl SessionManager {
    pub fn new(factory: ChatFactory) -> Self {
        Self {
            factory,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    async fn session(&self, session_id: &str) -> Result<Arc<Mutex<GroupChat>>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(chat) = sessions.get(session_id) {
            return Ok(chat.clone());
        }

        let chat = Arc::new(Mutex::new((self.factory)()?));
        sessions.insert(session_id.to_string(), chat.clone());
        info!(session = session_id, "session started");
        Ok(chat)
    }

    /// Run a round in `session_id`, creating the session on first use
    pub async fn submit_user_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> std::result::Result<Vec<Utterance>, RoundError> {
        let chat = self
            .session(session_id)
            .await
            .map_err(|e| RoundError::new(Vec::new(), e))?;
        let mut chat = chat.lock().await;
        chat.submit(text).await
    }

    /// Discard a session's history; the next message starts over
    ///
    /// Resetting an unknown or already reset session is a no-op.
    pub async fn reset_session(&self, session_id: &str) {
        if self.sessions.lock().await.remove(session_id).is_some() {
            info!(session = session_id, "session reset");
        }
    }

    pub async fn end_session(&self, session_id: &str) {
        if self.sessions.lock().await.remove(session_id).is_some() {
            info!(session = session_id, "session ended");
        }
    }

    /// Snapshot of a session's history, if it exists
    pub async fn history(&self, session_id: &str) -> Option<Vec<Utterance>> {
        let chat = self.sessions.lock().await.get(session_id).cloned()?;
        let chat = chat.lock().await;
        Some(chat.history().as_slice().to_vec())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
