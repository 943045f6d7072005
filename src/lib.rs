//! threadchat: terminal chat over hosted agent threads.
//!
//! A session owns one remote thread. Each prompt is posted to it, a run of
//! the configured agent is started and polled to completion, and the newest
//! assistant message is returned.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use threadchat::prelude::*;
//!
//! # async fn example() -> threadchat::error::Result<()> {
//! let config = ChatConfig::load(None, ConfigLayer::default())?;
//! let service: Arc<dyn AgentService> = Arc::new(HttpAgentService::from_config(&config)?);
//! let mut chat = ChatSession::new(SessionManager::from_config(service, &config));
//! let entry = chat.submit("Hello!").await?;
//! println!("{}", entry.content);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod session;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
