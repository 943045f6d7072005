//! Convenience re-exports for common use.

pub use crate::client::{AgentService, HttpAgentService, MessageRole, Run, RunStatus, ThreadMessage};
pub use crate::config::{ChatConfig, ConfigLayer};
pub use crate::error::{ChatError, ErrorKind, Result};
pub use crate::session::{ChatSession, History, HistoryEntry, HistoryRole, SessionManager, NO_REPLY};
