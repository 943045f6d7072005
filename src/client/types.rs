//! Wire types for the agent service threads API.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque identifier of a remote conversation thread.
pub type ThreadId = String;

/// Author of a thread message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Sort order for listing thread messages by creation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ListOrder {
    Asc,
    Desc,
}

/// Hosted agent metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl AgentInfo {
    /// Human-readable label, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

/// A remote thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thread {
    pub id: ThreadId,
    #[serde(default)]
    pub created_at: i64,
}

/// A message stored on a remote thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadMessage {
    #[serde(default)]
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    #[serde(default)]
    pub created_at: i64,
}

impl ThreadMessage {
    /// Build a message with a single text part.
    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            role,
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: text.into(),
                },
            }],
            created_at: 0,
        }
    }

    /// Text parts of this message in order.
    pub fn text_segments(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|part| match part {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Other => None,
        })
    }

    /// The last text segment, if the message has any text.
    pub fn latest_text(&self) -> Option<&str> {
        self.text_segments().last()
    }
}

/// One content part of a message. Only text is rendered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    pub value: String,
}

/// Remote run lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// Whether the run will not change status again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Failed | Self::Completed | Self::Incomplete | Self::Expired
        )
    }
}

/// Structured error reported by the service for a failed run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// A remote processing run over a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    /// Message describing why a non-completed run ended.
    pub fn failure_message(&self) -> String {
        match &self.last_error {
            Some(err) if !err.message.is_empty() => err.message.clone(),
            _ => format!("run ended with status {}", self.status),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageList {
    pub data: Vec<ThreadMessage>,
}
