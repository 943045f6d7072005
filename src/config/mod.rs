//! Configuration system (layered: defaults > secrets file > env > flags).

pub mod file;

pub use file::{default_secrets_path, ConfigLayer};

use std::fmt;
use std::path::Path;
use std::time::Duration;

use bon::Builder;

use crate::auth::credential::{DEFAULT_AUTHORITY_HOST, DEFAULT_SCOPE};
use crate::error::{ChatError, Result};

pub const DEFAULT_API_VERSION: &str = "v1";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Smallest accepted run poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Service principal identity used for the client-credentials exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"..")
            .finish()
    }
}

/// Resolved configuration for one chat process.
///
/// # Example
/// ```
/// use threadchat::config::ChatConfig;
///
/// let config = ChatConfig::builder()
///     .endpoint("https://example.services.ai.azure.com/api/projects/demo")
///     .agent_id("asst_123")
///     .access_token("token".to_string())
///     .build();
/// assert_eq!(config.history_limit, 20);
/// ```
#[derive(Clone, Builder)]
pub struct ChatConfig {
    /// Project endpoint of the agent service.
    #[builder(into)]
    pub endpoint: String,
    /// Hosted agent that runs are bound to.
    #[builder(into)]
    pub agent_id: String,
    pub credentials: Option<Credentials>,
    /// Pre-acquired bearer token; skips the credential exchange when set.
    pub access_token: Option<String>,
    #[builder(into, default = DEFAULT_API_VERSION.to_string())]
    pub api_version: String,
    #[builder(into, default = DEFAULT_AUTHORITY_HOST.to_string())]
    pub authority_host: String,
    #[builder(into, default = DEFAULT_SCOPE.to_string())]
    pub scope: String,
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    pub poll_interval: Duration,
    pub run_timeout: Option<Duration>,
    /// Page size used when reading back the thread after a run.
    #[builder(default = DEFAULT_HISTORY_LIMIT)]
    pub history_limit: u32,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("endpoint", &self.endpoint)
            .field("agent_id", &self.agent_id)
            .field("credentials", &self.credentials)
            .field("access_token", &self.access_token.as_ref().map(|_| ".."))
            .field("api_version", &self.api_version)
            .field("authority_host", &self.authority_host)
            .field("scope", &self.scope)
            .field("poll_interval", &self.poll_interval)
            .field("run_timeout", &self.run_timeout)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

impl ChatConfig {
    /// Load configuration from the secrets file, the environment, and
    /// explicit overrides, in increasing order of precedence.
    ///
    /// `secrets_path` of `None` falls back to [`default_secrets_path`]; a
    /// missing default file is not an error, a missing explicit one is.
    pub fn load(secrets_path: Option<&Path>, overrides: ConfigLayer) -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        let file_layer = match secrets_path {
            Some(path) => ConfigLayer::from_secrets_file(path)?,
            None => match default_secrets_path() {
                Some(path) if path.exists() => ConfigLayer::from_secrets_file(&path)?,
                _ => ConfigLayer::default(),
            },
        };

        file_layer
            .overlay(ConfigLayer::from_env()?)
            .overlay(overrides)
            .resolve()
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ChatError::Configuration(
                "endpoint is required (THREADCHAT_ENDPOINT or [azure].endpoint)".to_string(),
            ));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ChatError::Configuration(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.agent_id.trim().is_empty() {
            return Err(ChatError::Configuration(
                "agent_id is required (THREADCHAT_AGENT_ID or [azure].agent_id)".to_string(),
            ));
        }
        if self.access_token.is_none() && self.credentials.is_none() {
            return Err(ChatError::Configuration(
                "credentials are required: set tenant, client and secret, or THREADCHAT_ACCESS_TOKEN"
                    .to_string(),
            ));
        }
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(ChatError::Configuration(format!(
                "poll_interval must be at least {}ms, got {}ms",
                MIN_POLL_INTERVAL.as_millis(),
                self.poll_interval.as_millis()
            )));
        }
        if self.history_limit == 0 {
            return Err(ChatError::Configuration(
                "history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
