//! Terminal rendering and the interactive chat loop.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::client::ListOrder;
use crate::error::{ChatError, Result};
use crate::session::{ChatSession, HistoryEntry, HistoryRole, SessionManager};

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Empty,
    Quit,
    ShowHistory,
    Prompt(String),
}

impl InputLine {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Empty,
            "/quit" | "/exit" => Self::Quit,
            "/history" => Self::ShowHistory,
            text => Self::Prompt(text.to_string()),
        }
    }
}

/// Format a transcript entry as terminal lines.
pub fn render_entry(entry: &HistoryEntry) -> String {
    let label = match entry.role {
        HistoryRole::User => "you",
        HistoryRole::Assistant => "agent",
        HistoryRole::Error => "⚠️ error",
    };
    let mut lines = entry.content.lines();
    let mut out = format!("{label}> {}", lines.next().unwrap_or_default());
    let indent = " ".repeat(label.chars().count() + 2);
    for line in lines {
        out.push('\n');
        out.push_str(&indent);
        out.push_str(line);
    }
    out
}

/// Drive an interactive session until `/quit`, end of input, or the
/// session is blocked.
pub async fn run_chat<R, W>(chat: &mut ChatSession, title: &str, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "=".repeat(title.chars().count()))?;
    writeln!(out, "Type a message, /history to replay, /quit to leave.")?;
    out.flush()?;

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            return Ok(());
        };

        match InputLine::parse(&line) {
            InputLine::Empty => continue,
            InputLine::Quit => return Ok(()),
            InputLine::ShowHistory => {
                for entry in chat.history().entries() {
                    writeln!(out, "{}", render_entry(entry))?;
                }
            }
            InputLine::Prompt(prompt) => {
                let entry = chat.submit(&prompt).await?;
                writeln!(out, "{}", render_entry(entry))?;
                if let Some(reason) = chat.blocked_reason() {
                    return Err(ChatError::Authentication(reason.to_string()));
                }
            }
        }
    }
}

/// Ask once on a fresh thread, then print every text message in it.
pub async fn run_ask<W: Write>(manager: &SessionManager, prompt: &str, out: &mut W) -> Result<()> {
    let thread_id = manager.ensure_thread().await?.to_string();
    writeln!(out, "Created thread, ID: {thread_id}")?;

    if let Err(err) = manager.ask(prompt).await {
        if let ChatError::RemoteRun { message, .. } = &err {
            writeln!(out, "Run failed: {message}")?;
        }
        return Err(err);
    }

    let messages = manager
        .service()
        .list_messages(&thread_id, ListOrder::Asc, 100)
        .await?;
    for message in &messages {
        if let Some(text) = message.latest_text() {
            writeln!(out, "{}: {text}", message.role)?;
        }
    }
    Ok(())
}
