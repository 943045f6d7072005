//! Local transcript of a chat session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
    /// Inline error bubble for a failed turn.
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only transcript. The remote thread stays authoritative.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: HistoryRole, content: impl Into<String>) -> &HistoryEntry {
        self.entries.push(HistoryEntry {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries authored by `role`.
    pub fn by_role(&self, role: HistoryRole) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(move |e| e.role == role)
    }
}
