//! Error types for threadchat.

pub mod unified;

pub use unified::{ErrorCategory, ErrorKind, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all threadchat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The remote run reached a failed terminal state.
    #[error("{message}")]
    RemoteRun {
        message: String,
        code: Option<String>,
    },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ChatError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a remote run failure carrying the service-reported message.
    pub fn remote_run(message: impl Into<String>, code: Option<String>) -> Self {
        Self::RemoteRun {
            message: message.into(),
            code,
        }
    }

    /// The closed classification used at the chat boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::Auth,
            Self::Api {
                status: 401 | 403,
                ..
            } => ErrorKind::Auth,
            Self::RemoteRun { .. } => ErrorKind::RemoteRun,
            _ => ErrorKind::Transport,
        }
    }

    /// Classify this error into a finer-grained category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RemoteRun { .. } => ErrorCategory::RemoteRun,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) | Self::Transport(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error blocks the session from further use.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server => {
                RecoverySuggestion::TryAgainLater
            }
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::RemoteRun => RecoverySuggestion::RephrasePrompt,
            _ => RecoverySuggestion::ContactSupport,
        }
    }

    /// Render this error for an inline chat bubble.
    ///
    /// Run failures are shown verbatim.
    pub fn display_message(&self) -> String {
        match self {
            Self::RemoteRun { message, .. } => message.clone(),
            Self::Api { status, message } => format!("Service error (status {status}):\n{message}"),
            other => other.to_string(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ChatError>;
