use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::error::AuthError;
use super::token::Token;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_SCOPE: &str = "https://ai.azure.com/.default";

/// Refresh a cached token once it is this close to expiry.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Source of bearer tokens for the agent service.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self) -> Result<Token, AuthError>;
}

/// A pre-acquired bearer token that is handed out unchanged.
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: Token,
}

impl StaticTokenCredential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            token: Token {
                access_token: access_token.into(),
                expires_at: None,
            },
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self) -> Result<Token, AuthError> {
        Ok(self.token.clone())
    }
}

/// OAuth2 client-credentials exchange against a Microsoft Entra style tenant.
///
/// The issued token is cached and reused until it comes within five minutes
/// of expiry. Concurrent callers share a single in-flight exchange.
///
/// # Example
/// ```no_run
/// use threadchat::auth::{ClientSecretCredential, TokenCredential};
///
/// # async fn example() -> Result<(), threadchat::auth::AuthError> {
/// let credential = ClientSecretCredential::new("tenant-id", "client-id", "secret");
/// let token = credential.get_token().await?;
/// println!("{}", token.access_token);
/// # Ok(())
/// # }
/// ```
pub struct ClientSecretCredential {
    client: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
    scope: String,
    cached: Mutex<Option<Token>>,
}

impl std::fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"..")
            .field("authority_host", &self.authority_host)
            .field("scope", &self.scope)
            .finish()
    }
}

impl ClientSecretCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            cached: Mutex::new(None),
        }
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    async fn exchange(&self) -> Result<Token, AuthError> {
        tracing::debug!(tenant = %self.tenant_id, client = %self.client_id, "requesting access token");
        let resp = self
            .client
            .post(self.token_url())
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000));
            return Err(AuthError::RateLimited { retry_after_ms });
        }

        let body = resp.text().await?;
        if !status.is_success() {
            let description = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or_else(|| format!("token request failed with status {status}"));
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    AuthError::InvalidClient(description)
                }
                StatusCode::FORBIDDEN => AuthError::AccessDenied(description),
                StatusCode::REQUEST_TIMEOUT => AuthError::Unavailable(description),
                s if s.is_server_error() => AuthError::Unavailable(description),
                _ => AuthError::InvalidResponse(description),
            });
        }

        let payload: TokenResponse = serde_json::from_str(&body)?;
        if payload.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "token response missing access_token".to_string(),
            ));
        }
        Ok(Token {
            access_token: payload.access_token,
            // Out-of-range lifetimes are treated as non-expiring.
            expires_at: payload
                .expires_in
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime)),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self) -> Result<Token, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Duration::seconds(REFRESH_MARGIN_SECS)) {
                return Ok(token.clone());
            }
        }
        let token = self.exchange().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "de_lenient_secs")]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Some identity endpoints send `expires_in` as a string.
fn de_lenient_secs<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}
