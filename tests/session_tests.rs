//! Tests for the session manager and chat session.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use threadchat::client::{AgentService, ListOrder, MessageRole};
use threadchat::error::{ChatError, ErrorKind};
use threadchat::session::{ChatSession, HistoryRole, SessionManager, NO_REPLY};

use common::{assistant, user, MockAgentService, RunScript};

fn manager_with(service: &Arc<MockAgentService>) -> SessionManager {
    let shared: Arc<dyn AgentService> = service.clone();
    SessionManager::new(shared, "asst_test")
}

#[tokio::test]
async fn sequential_asks_reuse_one_thread() {
    let service = Arc::new(MockAgentService::new());
    service.queue(RunScript::Reply("first".to_string()));
    service.queue(RunScript::Reply("second".to_string()));
    let manager = manager_with(&service);

    assert!(manager.thread_id().is_none());
    assert_eq!(manager.ask("one").await.unwrap(), "first");
    let thread = manager.thread_id().unwrap().to_string();
    assert_eq!(manager.ask("two").await.unwrap(), "second");

    assert_eq!(manager.thread_id(), Some(thread.as_str()));
    assert_eq!(service.threads_created(), 1);
    let posted = service.messages_posted();
    assert_eq!(posted.len(), 2);
    assert!(posted.iter().all(|(t, _)| *t == thread));
}

#[tokio::test]
async fn each_ask_posts_once_and_runs_once() {
    let service = Arc::new(MockAgentService::new());
    let manager = manager_with(&service);

    manager.ask("same").await.unwrap();
    manager.ask("same").await.unwrap();

    assert_eq!(
        service.messages_posted(),
        vec![
            ("thread_1".to_string(), "same".to_string()),
            ("thread_1".to_string(), "same".to_string()),
        ]
    );
    assert_eq!(
        service.runs_started(),
        vec![
            ("thread_1".to_string(), "asst_test".to_string()),
            ("thread_1".to_string(), "asst_test".to_string()),
        ]
    );
}

#[tokio::test]
async fn concurrent_asks_create_exactly_one_thread() {
    let service = Arc::new(MockAgentService::new().with_create_delay(Duration::from_millis(20)));
    let manager = manager_with(&service);

    let asks = (0..8).map(|i| {
        let manager = &manager;
        async move { manager.ask(&format!("question {i}")).await }
    });
    let results = futures::future::join_all(asks).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(service.threads_created(), 1);
    assert_eq!(service.messages_posted().len(), 8);
    assert!(service
        .messages_posted()
        .iter()
        .all(|(thread, _)| thread == "thread_1"));
}

#[tokio::test]
async fn failed_run_surfaces_service_message() {
    let service = Arc::new(MockAgentService::new());
    service.queue(RunScript::Fail("quota exceeded".to_string()));
    let manager = manager_with(&service);

    let err = manager.ask("hello").await.unwrap_err();
    match &err {
        ChatError::RemoteRun { message, code } => {
            assert_eq!(message, "quota exceeded");
            assert_eq!(code.as_deref(), Some("server_error"));
        }
        other => panic!("expected remote run error, got {other:?}"),
    }
    assert_eq!(err.to_string(), "quota exceeded");
    assert_eq!(err.kind(), ErrorKind::RemoteRun);
    assert!(service.list_calls().is_empty());
}

#[tokio::test]
async fn missing_assistant_message_returns_sentinel() {
    let service = Arc::new(MockAgentService::new());
    service.queue(RunScript::NoReply);
    let manager = manager_with(&service);

    assert_eq!(manager.ask("anyone there?").await.unwrap(), NO_REPLY);
    assert_eq!(NO_REPLY, "(no reply)");
}

#[tokio::test]
async fn latest_assistant_message_wins() {
    let service = Arc::new(MockAgentService::new());
    service.queue(RunScript::ReplaceThread(vec![
        user("hi"),
        assistant("hello"),
        user("bye"),
        assistant("goodbye"),
    ]));
    let manager = manager_with(&service);

    assert_eq!(manager.ask("bye").await.unwrap(), "goodbye");
}

#[tokio::test]
async fn run_without_reply_does_not_repeat_previous_answer() {
    let service = Arc::new(MockAgentService::new());
    service.queue(RunScript::Reply("hello".to_string()));
    service.queue(RunScript::NoReply);
    let manager = manager_with(&service);

    assert_eq!(manager.ask("hi").await.unwrap(), "hello");
    assert_eq!(manager.ask("bye").await.unwrap(), NO_REPLY);
    let roles: Vec<_> = service
        .thread("thread_1")
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(
        roles,
        vec![MessageRole::User, MessageRole::Assistant, MessageRole::User]
    );
}

#[tokio::test]
async fn reply_is_taken_from_after_the_prompt() {
    let service = Arc::new(MockAgentService::new());
    service.queue(RunScript::Reply("first answer".to_string()));
    service.queue(RunScript::Reply("second answer".to_string()));
    let manager = manager_with(&service);

    assert_eq!(manager.ask("one").await.unwrap(), "first answer");
    assert_eq!(manager.ask("two").await.unwrap(), "second answer");
}

#[tokio::test]
async fn reply_window_reads_newest_messages() {
    let service = Arc::new(MockAgentService::new());
    let mut long_thread = Vec::new();
    for i in 0..30 {
        long_thread.push(user(&format!("q{i}")));
        long_thread.push(assistant(&format!("a{i}")));
    }
    service.queue(RunScript::ReplaceThread(long_thread));
    let manager = manager_with(&service).with_history_limit(5);

    assert_eq!(manager.ask("q29").await.unwrap(), "a29");
    assert_eq!(service.list_calls(), vec![(ListOrder::Desc, 5)]);
}

#[tokio::test]
async fn empty_prompt_is_rejected_before_any_remote_call() {
    let service = Arc::new(MockAgentService::new());
    let manager = manager_with(&service);

    let err = manager.ask("   ").await.unwrap_err();
    assert!(matches!(err, ChatError::InvalidArgument(_)));
    assert_eq!(service.threads_created(), 0);
    assert!(service.messages_posted().is_empty());
}

#[tokio::test]
async fn failed_thread_creation_can_be_retried() {
    let service = Arc::new(MockAgentService::new());
    service.fail_next_create(ChatError::Transport("connection reset".to_string()));
    let manager = manager_with(&service);

    assert!(manager.ask("hi").await.is_err());
    assert!(manager.thread_id().is_none());
    assert_eq!(manager.ask("hi again").await.unwrap(), "Mock reply");
    assert_eq!(manager.thread_id(), Some("thread_1"));
}

#[tokio::test]
async fn chat_turn_appends_user_then_assistant() {
    let service = Arc::new(MockAgentService::new());
    service.queue(RunScript::Reply("hi there".to_string()));
    let mut chat = ChatSession::new(manager_with(&service));

    let entry = chat.submit("hello").await.unwrap();
    assert_eq!(entry.role, HistoryRole::Assistant);
    assert_eq!(entry.content, "hi there");

    let history: Vec<_> = chat
        .history()
        .entries()
        .iter()
        .map(|e| (e.role, e.content.as_str()))
        .collect();
    assert_eq!(
        history,
        vec![
            (HistoryRole::User, "hello"),
            (HistoryRole::Assistant, "hi there"),
        ]
    );
}

#[tokio::test]
async fn failed_run_records_error_bubble_not_assistant_entry() {
    let service = Arc::new(MockAgentService::new());
    service.queue(RunScript::Fail("quota exceeded".to_string()));
    service.queue(RunScript::Reply("recovered".to_string()));
    let mut chat = ChatSession::new(manager_with(&service));

    let entry = chat.submit("hello").await.unwrap();
    assert_eq!(entry.role, HistoryRole::Error);
    assert_eq!(entry.content, "quota exceeded");
    assert_eq!(chat.history().by_role(HistoryRole::Assistant).count(), 0);
    assert!(chat.blocked_reason().is_none());

    let entry = chat.submit("again").await.unwrap();
    assert_eq!(entry.role, HistoryRole::Assistant);
    assert_eq!(entry.content, "recovered");
    assert_eq!(chat.history().len(), 4);
}

#[tokio::test]
async fn transport_failure_keeps_session_usable() {
    let service = Arc::new(MockAgentService::new());
    let mut chat = ChatSession::new(manager_with(&service));
    chat.submit("warm up").await.unwrap();
    service.fail_next_post(ChatError::api(503, "Service Unavailable"));

    let entry = chat.submit("hello").await.unwrap();
    assert_eq!(entry.role, HistoryRole::Error);
    assert_eq!(entry.content, "Service error (status 503):\nService Unavailable");
    assert!(chat.blocked_reason().is_none());
    assert!(chat.submit("next").await.is_ok());
}

#[tokio::test]
async fn auth_failure_blocks_the_session() {
    let service = Arc::new(MockAgentService::new());
    service.fail_next_create(ChatError::Authentication(
        "AADSTS7000215: Invalid client secret provided.".to_string(),
    ));
    let mut chat = ChatSession::new(manager_with(&service));

    let entry = chat.submit("hello").await.unwrap();
    assert_eq!(entry.role, HistoryRole::Error);
    assert!(chat.blocked_reason().is_some());

    let err = chat.submit("again").await.unwrap_err();
    assert!(matches!(err, ChatError::InvalidState(_)));
    assert_eq!(service.threads_created(), 0);
    assert_eq!(chat.history().len(), 2);
}

#[tokio::test]
async fn empty_submit_leaves_history_untouched() {
    let service = Arc::new(MockAgentService::new());
    let mut chat = ChatSession::new(manager_with(&service));

    assert!(chat.submit("\n").await.is_err());
    assert!(chat.history().is_empty());
}
