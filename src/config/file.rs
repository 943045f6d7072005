//! Partial configuration layers read from the secrets file and environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::{ChatConfig, Credentials};
use crate::error::{ChatError, Result};

const SECRETS_ENV: &str = "THREADCHAT_SECRETS";
const LOCAL_SECRETS: &str = ".threadchat/secrets.toml";

/// One source of configuration values. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub endpoint: Option<String>,
    pub agent_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub api_version: Option<String>,
    pub authority_host: Option<String>,
    pub scope: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub run_timeout_secs: Option<u64>,
    pub history_limit: Option<u32>,
}

impl ConfigLayer {
    /// Read a secrets TOML file with an `[azure]` table and optional `[chat]` table.
    pub fn from_secrets_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            ChatError::Configuration(format!(
                "cannot read secrets file {}: {err}",
                path.display()
            ))
        })?;
        Self::from_secrets_str(&raw).map_err(|err| match err {
            ChatError::Configuration(msg) => {
                ChatError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_secrets_str(raw: &str) -> Result<Self> {
        let file: SecretsFile =
            toml::from_str(raw).map_err(|err| ChatError::Configuration(err.to_string()))?;
        let azure = file.azure.unwrap_or_default();
        let chat = file.chat.unwrap_or_default();
        Ok(Self {
            endpoint: azure.endpoint,
            agent_id: azure.agent_id,
            tenant_id: azure.tenant,
            client_id: azure.client,
            client_secret: azure.secret,
            access_token: azure.access_token,
            api_version: chat.api_version,
            authority_host: azure.authority_host,
            scope: azure.scope,
            poll_interval_ms: chat.poll_interval_ms,
            run_timeout_secs: chat.run_timeout_secs,
            history_limit: chat.history_limit,
        })
    }

    /// Read the `THREADCHAT_*` / `AZURE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: env_string("THREADCHAT_ENDPOINT"),
            agent_id: env_string("THREADCHAT_AGENT_ID"),
            tenant_id: env_string("AZURE_TENANT_ID"),
            client_id: env_string("AZURE_CLIENT_ID"),
            client_secret: env_string("AZURE_CLIENT_SECRET"),
            access_token: env_string("THREADCHAT_ACCESS_TOKEN"),
            api_version: env_string("THREADCHAT_API_VERSION"),
            authority_host: env_string("AZURE_AUTHORITY_HOST"),
            scope: env_string("THREADCHAT_SCOPE"),
            poll_interval_ms: env_parsed("THREADCHAT_POLL_INTERVAL_MS")?,
            run_timeout_secs: env_parsed("THREADCHAT_RUN_TIMEOUT_SECS")?,
            history_limit: env_parsed("THREADCHAT_HISTORY_LIMIT")?,
        })
    }

    /// Layer `higher` on top of `self`; set fields in `higher` win.
    pub fn overlay(self, higher: ConfigLayer) -> Self {
        Self {
            endpoint: higher.endpoint.or(self.endpoint),
            agent_id: higher.agent_id.or(self.agent_id),
            tenant_id: higher.tenant_id.or(self.tenant_id),
            client_id: higher.client_id.or(self.client_id),
            client_secret: higher.client_secret.or(self.client_secret),
            access_token: higher.access_token.or(self.access_token),
            api_version: higher.api_version.or(self.api_version),
            authority_host: higher.authority_host.or(self.authority_host),
            scope: higher.scope.or(self.scope),
            poll_interval_ms: higher.poll_interval_ms.or(self.poll_interval_ms),
            run_timeout_secs: higher.run_timeout_secs.or(self.run_timeout_secs),
            history_limit: higher.history_limit.or(self.history_limit),
        }
    }

    /// Build and validate a [`ChatConfig`] from this layer plus defaults.
    pub fn resolve(self) -> Result<ChatConfig> {
        let credentials = match (self.tenant_id, self.client_id, self.client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Some(Credentials {
                tenant_id,
                client_id,
                client_secret,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ChatError::Configuration(
                    "tenant, client and secret must be set together".to_string(),
                ))
            }
        };

        let mut config = ChatConfig::builder()
            .endpoint(self.endpoint.unwrap_or_default())
            .agent_id(self.agent_id.unwrap_or_default())
            .maybe_credentials(credentials)
            .maybe_access_token(self.access_token)
            .maybe_run_timeout(self.run_timeout_secs.map(Duration::from_secs))
            .build();
        if let Some(version) = self.api_version {
            config.api_version = version;
        }
        if let Some(host) = self.authority_host {
            config.authority_host = host;
        }
        if let Some(scope) = self.scope {
            config.scope = scope;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(limit) = self.history_limit {
            config.history_limit = limit;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Where the secrets file is looked up when no path is given.
///
/// `$THREADCHAT_SECRETS`, then `./.threadchat/secrets.toml`, then the
/// per-user config directory.
pub fn default_secrets_path() -> Option<PathBuf> {
    if let Some(path) = env_string(SECRETS_ENV) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(LOCAL_SECRETS);
    if local.exists() {
        return Some(local);
    }
    directories::ProjectDirs::from("", "", "threadchat")
        .map(|dirs| dirs.config_dir().join("secrets.toml"))
}

#[derive(Debug, Default, Deserialize)]
struct SecretsFile {
    azure: Option<AzureSection>,
    chat: Option<ChatSection>,
}

#[derive(Debug, Default, Deserialize)]
struct AzureSection {
    endpoint: Option<String>,
    agent_id: Option<String>,
    tenant: Option<String>,
    client: Option<String>,
    secret: Option<String>,
    access_token: Option<String>,
    authority_host: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatSection {
    api_version: Option<String>,
    poll_interval_ms: Option<u64>,
    run_timeout_secs: Option<u64>,
    history_limit: Option<u32>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env_string(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ChatError::Configuration(format!("{key} has invalid value '{raw}'"))),
        None => Ok(None),
    }
}
