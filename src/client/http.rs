//! HTTPS/JSON implementation of [`AgentService`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::types::{
    AgentInfo, ListOrder, MessageList, MessageRole, Run, RunError, RunStatus, Thread, ThreadMessage,
};
use super::{AgentService, ThreadId};
use crate::auth::{ClientSecretCredential, StaticTokenCredential, TokenCredential};
use crate::config::{ChatConfig, DEFAULT_API_VERSION, DEFAULT_POLL_INTERVAL};
use crate::error::{ChatError, Result};
use crate::util::timeout::with_timeout;

const REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// Agent service client speaking the threads/runs REST API.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use threadchat::auth::StaticTokenCredential;
/// use threadchat::client::{AgentService, HttpAgentService};
///
/// # async fn example() -> threadchat::error::Result<()> {
/// let service = HttpAgentService::new(
///     "https://example.services.ai.azure.com/api/projects/demo",
///     Arc::new(StaticTokenCredential::new("token")),
/// );
/// let thread_id = service.create_thread().await?;
/// println!("{thread_id}");
/// # Ok(())
/// # }
/// ```
pub struct HttpAgentService {
    client: reqwest::Client,
    endpoint: String,
    api_version: String,
    credential: Arc<dyn TokenCredential>,
    poll_interval: Duration,
    run_timeout: Option<Duration>,
}

impl HttpAgentService {
    pub fn new(endpoint: impl Into<String>, credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            credential,
            poll_interval: DEFAULT_POLL_INTERVAL,
            run_timeout: None,
        }
    }

    /// Build the client and its credential from resolved configuration.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        config.validate()?;
        let client = default_client()?;

        let credential: Arc<dyn TokenCredential> = match (&config.access_token, &config.credentials) {
            (Some(token), _) => Arc::new(StaticTokenCredential::new(token.clone())),
            (None, Some(creds)) => Arc::new(
                ClientSecretCredential::new(
                    creds.tenant_id.clone(),
                    creds.client_id.clone(),
                    creds.client_secret.clone(),
                )
                .with_authority_host(config.authority_host.clone())
                .with_scope(config.scope.clone())
                .with_client(client.clone()),
            ),
            (None, None) => {
                return Err(ChatError::Configuration(
                    "no credentials configured".to_string(),
                ))
            }
        };

        Ok(Self::new(config.endpoint.clone(), credential)
            .with_client(client)
            .with_api_version(config.api_version.clone())
            .with_poll_interval(config.poll_interval)
            .with_run_timeout(config.run_timeout))
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    async fn headers(&self) -> Result<HeaderMap> {
        let token = self.credential.get_token().await?;
        let mut headers = bearer_headers(&token.access_token);
        if let Ok(val) = HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()) {
            headers.insert(REQUEST_ID_HEADER, val);
        }
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let resp = self
            .client
            .get(self.url(path))
            .headers(self.headers().await?)
            .query(&[("api-version", self.api_version.as_str())])
            .query(query)
            .send()
            .await?;
        decode(resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self
            .client
            .post(self.url(path))
            .headers(self.headers().await?)
            .query(&[("api-version", self.api_version.as_str())])
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.get_json(&format!("threads/{thread_id}/runs/{run_id}"), &[])
            .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.post_json(&format!("threads/{thread_id}/runs/{run_id}/cancel"), &json!({}))
            .await
    }

    async fn poll_until_terminal(&self, mut run: Run) -> Result<Run> {
        let mut last_status = run.status;
        tracing::debug!(run_id = %run.id, status = %run.status, "run started");
        loop {
            if run.status.is_terminal() {
                return Ok(run);
            }
            if run.status == RunStatus::RequiresAction {
                // Client-side tool outputs are not supported; stop the run.
                tracing::warn!(run_id = %run.id, "run requires action; cancelling");
                if let Err(e) = self.cancel_run(&run.thread_id, &run.id).await {
                    tracing::warn!(run_id = %run.id, error = %e, "cancel request failed");
                }
                run.status = RunStatus::Cancelled;
                run.last_error = Some(RunError {
                    code: Some("requires_action".to_string()),
                    message: "agent requested client-side tool outputs, which this client does not provide".to_string(),
                });
                return Ok(run);
            }

            tokio::time::sleep(self.poll_interval).await;
            let thread_id = run.thread_id.clone();
            run = self.get_run(&thread_id, &run.id).await?;
            if run.thread_id.is_empty() {
                run.thread_id = thread_id;
            }
            if run.status != last_status {
                tracing::debug!(run_id = %run.id, from = %last_status, to = %run.status, "run status changed");
                last_status = run.status;
            }
        }
    }
}

#[async_trait]
impl AgentService for HttpAgentService {
    async fn get_agent(&self, agent_id: &str) -> Result<AgentInfo> {
        self.get_json(&format!("assistants/{agent_id}"), &[]).await
    }

    async fn create_thread(&self) -> Result<ThreadId> {
        let thread: Thread = self.post_json("threads", &json!({})).await?;
        tracing::debug!(thread_id = %thread.id, "thread created");
        Ok(thread.id)
    }

    async fn post_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage> {
        self.post_json(
            &format!("threads/{thread_id}/messages"),
            &json!({ "role": role, "content": content }),
        )
        .await
    }

    async fn run_and_wait(&self, thread_id: &str, agent_id: &str) -> Result<Run> {
        let mut run: Run = self
            .post_json(
                &format!("threads/{thread_id}/runs"),
                &json!({ "assistant_id": agent_id }),
            )
            .await?;
        if run.thread_id.is_empty() {
            run.thread_id = thread_id.to_string();
        }

        match self.run_timeout {
            Some(limit) => with_timeout(limit, self.poll_until_terminal(run)).await,
            None => self.poll_until_terminal(run).await,
        }
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
        limit: u32,
    ) -> Result<Vec<ThreadMessage>> {
        let list: MessageList = self
            .get_json(
                &format!("threads/{thread_id}/messages"),
                &[("order", order.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(list.data)
    }
}

/// Build the HTTP client shared by the credential and the service.
pub fn default_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(10)
        .build()?)
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> ChatError {
    let message = extract_error_message(body).unwrap_or_else(|| body.to_string());
    match status {
        401 | 403 => ChatError::Authentication(message),
        429 => ChatError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => ChatError::api(status, message),
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(status_to_error(status.as_u16(), &body));
    }
    Ok(serde_json::from_str(&body)?)
}

fn extract_error_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<serde_json::Value>(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}
