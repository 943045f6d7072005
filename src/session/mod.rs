//! Conversation session bookkeeping and the ask cycle.

pub mod chat;
pub mod history;

pub use chat::ChatSession;
pub use history::{History, HistoryEntry, HistoryRole};

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::client::{AgentService, ListOrder, MessageRole, RunStatus, ThreadId};
use crate::config::{ChatConfig, DEFAULT_HISTORY_LIMIT};
use crate::error::{ChatError, Result};

/// Reply returned when no assistant text follows the prompt in the fetched window.
pub const NO_REPLY: &str = "(no reply)";

/// Progress of a single [`SessionManager::ask`] call.
///
/// `RunInProgress` is reported by the service client while it polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AskState {
    NotStarted,
    MessagePosted,
    RunQueued,
    RunInProgress,
    RunCompleted,
    ReplyFetched,
    RunFailed,
}

/// Owns one remote thread for a user session and drives the
/// post, run, fetch cycle against it.
///
/// The thread is created on first use. Concurrent `ask` calls on the same
/// manager share that creation, so a session never maps to two threads.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use threadchat::client::HttpAgentService;
/// use threadchat::config::ChatConfig;
/// use threadchat::session::SessionManager;
///
/// # async fn example(config: ChatConfig) -> threadchat::error::Result<()> {
/// let service = Arc::new(HttpAgentService::from_config(&config)?);
/// let session = SessionManager::new(service, config.agent_id.clone());
/// let reply = session.ask("Summarise the applicant's risk profile").await?;
/// println!("{reply}");
/// # Ok(())
/// # }
/// ```
pub struct SessionManager {
    service: Arc<dyn AgentService>,
    agent_id: String,
    history_limit: u32,
    thread_id: OnceCell<ThreadId>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("agent_id", &self.agent_id)
            .field("history_limit", &self.history_limit)
            .field("thread_id", &self.thread_id.get())
            .finish()
    }
}

impl SessionManager {
    pub fn new(service: Arc<dyn AgentService>, agent_id: impl Into<String>) -> Self {
        Self {
            service,
            agent_id: agent_id.into(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            thread_id: OnceCell::new(),
        }
    }

    /// Create a manager using the agent and window size from `config`.
    pub fn from_config(service: Arc<dyn AgentService>, config: &ChatConfig) -> Self {
        Self::new(service, config.agent_id.clone()).with_history_limit(config.history_limit)
    }

    /// Number of most recent messages read back after each run.
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// The thread bound to this session, if one has been created.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.get().map(String::as_str)
    }

    /// The shared service handle.
    pub fn service(&self) -> &Arc<dyn AgentService> {
        &self.service
    }

    /// Return the session thread, creating it on first call.
    ///
    /// A failed creation leaves the slot empty so a later call can retry.
    pub async fn ensure_thread(&self) -> Result<&str> {
        let id = self
            .thread_id
            .get_or_try_init(|| async {
                let id = self.service.create_thread().await?;
                tracing::info!(thread_id = %id, agent_id = %self.agent_id, "session thread created");
                Ok::<_, ChatError>(id)
            })
            .await?;
        Ok(id.as_str())
    }

    /// Send `prompt` to the agent and return its newest reply.
    ///
    /// Posts exactly one user message and starts exactly one run per call.
    /// A failed run surfaces as [`ChatError::RemoteRun`] with the service's
    /// message. When no assistant text follows the prompt in the fetched
    /// window the [`NO_REPLY`] sentinel is returned.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(ChatError::InvalidArgument(
                "prompt must not be empty".to_string(),
            ));
        }

        let mut state = AskState::NotStarted;
        let thread_id = self.ensure_thread().await?;

        let posted = self
            .service
            .post_message(thread_id, MessageRole::User, prompt)
            .await?;
        advance(&mut state, AskState::MessagePosted, thread_id);

        advance(&mut state, AskState::RunQueued, thread_id);
        let run = self.service.run_and_wait(thread_id, &self.agent_id).await?;

        if run.status != RunStatus::Completed {
            advance(&mut state, AskState::RunFailed, thread_id);
            let message = run.failure_message();
            tracing::warn!(thread_id, run_id = %run.id, status = %run.status, error = %message, "run did not complete");
            return Err(ChatError::remote_run(
                message,
                run.last_error.and_then(|e| e.code),
            ));
        }
        advance(&mut state, AskState::RunCompleted, thread_id);

        // Newest `history_limit` messages, restored to ascending order.
        let mut window = self
            .service
            .list_messages(thread_id, ListOrder::Desc, self.history_limit)
            .await?;
        window.reverse();

        // Only messages after our prompt count as this turn's reply. If the
        // prompt is not in the window, everything in it is newer.
        let start = window
            .iter()
            .position(|m| !posted.id.is_empty() && m.id == posted.id)
            .map_or(0, |i| i + 1);

        let reply = window[start..]
            .iter()
            .rev()
            .filter(|m| m.role == MessageRole::Assistant)
            .find_map(|m| m.latest_text())
            .map(str::to_string);
        advance(&mut state, AskState::ReplyFetched, thread_id);

        Ok(reply.unwrap_or_else(|| {
            tracing::debug!(thread_id, "no assistant message after prompt");
            NO_REPLY.to_string()
        }))
    }
}

fn advance(state: &mut AskState, next: AskState, thread_id: &str) {
    tracing::debug!(thread_id, from = %state, to = %next, "ask state");
    *state = next;
}
