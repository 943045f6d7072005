use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Bearer token issued by the identity provider.
///
/// # Example
/// ```
/// use threadchat::auth::Token;
/// use chrono::{Duration, Utc};
///
/// let token = Token {
///     access_token: "access".to_string(),
///     expires_at: Some(Utc::now() + Duration::hours(1)),
/// };
/// assert!(token.is_fresh(Duration::minutes(5)));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Whether the token stays valid for at least `margin` from now.
    ///
    /// Tokens without an expiry never go stale.
    pub fn is_fresh(&self, margin: Duration) -> bool {
        self.expires_at
            .map(|exp| exp - margin > Utc::now())
            .unwrap_or(true)
    }
}
