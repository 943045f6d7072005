//! Chat session: a [`SessionManager`] plus its local transcript.

use super::history::{History, HistoryEntry, HistoryRole};
use super::SessionManager;
use crate::error::{ChatError, Result};

/// One user's interactive conversation.
///
/// Every failure inside a turn is caught here and recorded as an error
/// entry, so a bad turn never leaves the transcript half-written. An
/// authentication failure additionally blocks the session.
#[derive(Debug)]
pub struct ChatSession {
    manager: SessionManager,
    history: History,
    blocked: Option<String>,
}

impl ChatSession {
    pub fn new(manager: SessionManager) -> Self {
        Self {
            manager,
            history: History::new(),
            blocked: None,
        }
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Reason the session can no longer be used, if blocked.
    pub fn blocked_reason(&self) -> Option<&str> {
        self.blocked.as_deref()
    }

    /// Run one turn and return the entry that answers it.
    ///
    /// The answer is an assistant entry on success and an error entry on
    /// failure. Returns `Err` only when the session is blocked or the prompt
    /// is empty; neither touches the transcript.
    pub async fn submit(&mut self, prompt: &str) -> Result<&HistoryEntry> {
        if let Some(reason) = &self.blocked {
            return Err(ChatError::InvalidState(format!(
                "session is blocked: {reason}"
            )));
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::InvalidArgument(
                "prompt must not be empty".to_string(),
            ));
        }

        self.history.push(HistoryRole::User, prompt);

        match self.manager.ask(prompt).await {
            Ok(reply) => Ok(self.history.push(HistoryRole::Assistant, reply)),
            Err(err) => {
                let message = err.display_message();
                if err.is_fatal() {
                    tracing::error!(error = %err, "authentication failed; blocking session");
                    self.blocked = Some(message.clone());
                } else {
                    tracing::warn!(error = %err, kind = ?err.kind(), "turn failed");
                }
                Ok(self.history.push(HistoryRole::Error, message))
            }
        }
    }
}
