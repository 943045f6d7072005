//! Credential providers that turn configured identities into bearer tokens.

pub mod credential;
pub mod error;
pub mod token;

pub use credential::{ClientSecretCredential, StaticTokenCredential, TokenCredential};
pub use error::AuthError;
pub use token::Token;
