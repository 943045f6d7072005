//! Agent service client facade.

pub mod http;
pub mod types;

pub use http::HttpAgentService;
pub use types::{
    AgentInfo, ListOrder, MessageContent, MessageRole, Run, RunError, RunStatus, TextContent,
    Thread, ThreadId, ThreadMessage,
};

use async_trait::async_trait;

use crate::error::Result;

/// The remote calls a chat session depends on.
///
/// Implementations must be safe to share across sessions; each call is
/// independent and scoped by its thread id.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Fetch metadata for a hosted agent.
    async fn get_agent(&self, agent_id: &str) -> Result<AgentInfo>;

    /// Create an empty conversation thread.
    async fn create_thread(&self) -> Result<ThreadId>;

    /// Append a message to a thread.
    async fn post_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage>;

    /// Start a run of `agent_id` over the thread and wait until it reaches a
    /// terminal status.
    async fn run_and_wait(&self, thread_id: &str, agent_id: &str) -> Result<Run>;

    /// List up to `limit` messages of a thread in creation order.
    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
        limit: u32,
    ) -> Result<Vec<ThreadMessage>>;
}
