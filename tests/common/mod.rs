//! Shared test helpers and an in-memory agent service.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use threadchat::client::{
    AgentInfo, AgentService, ListOrder, MessageRole, Run, RunError, RunStatus, ThreadId,
    ThreadMessage,
};
use threadchat::error::{ChatError, Result};

/// What the next run does to its thread.
#[derive(Debug, Clone)]
pub enum RunScript {
    /// Append one assistant message and complete.
    Reply(String),
    /// Complete without adding an assistant message.
    NoReply,
    /// Replace the whole thread with these messages and complete.
    ReplaceThread(Vec<ThreadMessage>),
    /// End in `failed` with this service message.
    Fail(String),
}

#[derive(Default)]
struct MockState {
    threads: HashMap<ThreadId, Vec<ThreadMessage>>,
    scripts: VecDeque<RunScript>,
    threads_created: usize,
    messages_posted: Vec<(ThreadId, String)>,
    runs_started: Vec<(ThreadId, String)>,
    list_calls: Vec<(ListOrder, u32)>,
    next_message_id: usize,
    create_error: Option<ChatError>,
    post_error: Option<ChatError>,
}

impl MockState {
    fn message_id(&mut self) -> String {
        self.next_message_id += 1;
        format!("msg_{}", self.next_message_id)
    }
}

/// An agent service that keeps threads in memory and replays scripted runs.
#[derive(Default)]
pub struct MockAgentService {
    state: Mutex<MockState>,
    create_delay: Option<Duration>,
}

impl MockAgentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slow down thread creation so concurrent callers overlap.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn queue(&self, script: RunScript) {
        self.state.lock().unwrap().scripts.push_back(script);
    }

    pub fn fail_next_create(&self, error: ChatError) {
        self.state.lock().unwrap().create_error = Some(error);
    }

    pub fn fail_next_post(&self, error: ChatError) {
        self.state.lock().unwrap().post_error = Some(error);
    }

    pub fn threads_created(&self) -> usize {
        self.state.lock().unwrap().threads_created
    }

    pub fn messages_posted(&self) -> Vec<(ThreadId, String)> {
        self.state.lock().unwrap().messages_posted.clone()
    }

    pub fn runs_started(&self) -> Vec<(ThreadId, String)> {
        self.state.lock().unwrap().runs_started.clone()
    }

    pub fn list_calls(&self) -> Vec<(ListOrder, u32)> {
        self.state.lock().unwrap().list_calls.clone()
    }

    pub fn thread(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.state
            .lock()
            .unwrap()
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AgentService for MockAgentService {
    async fn get_agent(&self, agent_id: &str) -> Result<AgentInfo> {
        Ok(AgentInfo {
            id: agent_id.to_string(),
            name: Some("Mock Agent".to_string()),
            model: Some("gpt-4o".to_string()),
            instructions: None,
        })
    }

    async fn create_thread(&self) -> Result<ThreadId> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.create_error.take() {
            return Err(err);
        }
        state.threads_created += 1;
        let id = format!("thread_{}", state.threads_created);
        state.threads.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn post_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.post_error.take() {
            return Err(err);
        }
        let mut message = ThreadMessage::text(role, content);
        message.id = state.message_id();
        state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| ChatError::api(404, format!("No thread found with id '{thread_id}'")))?
            .push(message.clone());
        state
            .messages_posted
            .push((thread_id.to_string(), content.to_string()));
        Ok(message)
    }

    async fn run_and_wait(&self, thread_id: &str, agent_id: &str) -> Result<Run> {
        let mut state = self.state.lock().unwrap();
        state
            .runs_started
            .push((thread_id.to_string(), agent_id.to_string()));
        let run_id = format!("run_{}", state.runs_started.len());
        let script = state
            .scripts
            .pop_front()
            .unwrap_or_else(|| RunScript::Reply("Mock reply".to_string()));
        let thread = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| ChatError::api(404, format!("No thread found with id '{thread_id}'")))?;

        let (status, last_error) = match script {
            RunScript::Reply(text) => {
                let mut reply = ThreadMessage::text(MessageRole::Assistant, text);
                reply.id = format!("msg_reply_{run_id}");
                thread.push(reply);
                (RunStatus::Completed, None)
            }
            RunScript::NoReply => (RunStatus::Completed, None),
            RunScript::ReplaceThread(messages) => {
                *thread = messages;
                (RunStatus::Completed, None)
            }
            RunScript::Fail(message) => (
                RunStatus::Failed,
                Some(RunError {
                    code: Some("server_error".to_string()),
                    message,
                }),
            ),
        };

        Ok(Run {
            id: run_id,
            thread_id: thread_id.to_string(),
            status,
            last_error,
        })
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
        limit: u32,
    ) -> Result<Vec<ThreadMessage>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls.push((order, limit));
        let mut messages = state.threads.get(thread_id).cloned().unwrap_or_default();
        if order == ListOrder::Desc {
            messages.reverse();
        }
        messages.truncate(limit as usize);
        Ok(messages)
    }
}

pub fn user(text: &str) -> ThreadMessage {
    ThreadMessage::text(MessageRole::User, text)
}

pub fn assistant(text: &str) -> ThreadMessage {
    ThreadMessage::text(MessageRole::Assistant, text)
}
