//! Error classification and recovery.

/// Closed error classification surfaced to the chat layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential exchange or authorization failed. Fatal for the session.
    Auth,
    /// The remote run ended in a failed state.
    RemoteRun,
    /// Any other network or service fault.
    Transport,
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RemoteRun,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    TryAgainLater,
    CheckCredentials,
    CheckConfiguration,
    IncreaseTimeout,
    RephrasePrompt,
    ContactSupport,
}
