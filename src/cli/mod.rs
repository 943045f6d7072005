//! CLI entry point for threadchat.

pub mod repl;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ConfigLayer;

const DEFAULT_FILTER: &str = "threadchat=warn";
const VERBOSE_FILTER: &str = "threadchat=debug";

/// threadchat CLI
#[derive(Parser, Debug)]
#[command(name = "threadchat", version, about = "Chat with a hosted agent from the terminal")]
pub struct Cli {
    /// Secrets file with an [azure] table (defaults to .threadchat/secrets.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Agent service project endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Hosted agent id to run against
    #[arg(long, global = true)]
    pub agent_id: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Interactive chat session (default)
    Chat,
    /// Ask one question on a fresh thread and print the thread
    Ask(AskArgs),
}

/// Arguments for `threadchat ask`.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct AskArgs {
    /// Prompt to send
    pub prompt: String,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command to run, defaulting to `chat`.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Chat)
    }

    /// Tracing filter directives. `--verbose` takes precedence over `RUST_LOG`.
    pub fn log_filter(&self, rust_log: Option<&str>) -> String {
        if self.verbose {
            return VERBOSE_FILTER.to_string();
        }
        rust_log
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_FILTER)
            .to_string()
    }

    /// Flag values as the highest-precedence configuration layer.
    pub fn overrides(&self) -> ConfigLayer {
        ConfigLayer {
            endpoint: self.endpoint.clone(),
            agent_id: self.agent_id.clone(),
            ..Default::default()
        }
    }
}
