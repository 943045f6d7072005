use thiserror::Error;

use crate::error::ChatError;

/// Normalized credential exchange errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid client credentials: {0}")]
    InvalidClient(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Rate limited")]
    RateLimited { retry_after_ms: Option<u64> },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    /// The identity provider answered with a transient server-side failure.
    #[error("Token endpoint unavailable: {0}")]
    Unavailable(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for ChatError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::RateLimited { retry_after_ms } => ChatError::RateLimited { retry_after_ms },
            AuthError::Network(message) => ChatError::Transport(message),
            AuthError::Unavailable(message) => {
                ChatError::Transport(format!("token endpoint unavailable: {message}"))
            }
            other => ChatError::Authentication(other.to_string()),
        }
    }
}
