//! threadchat binary entry point.

use std::sync::Arc;

use threadchat::cli::repl::{run_ask, run_chat};
use threadchat::cli::{Cli, Commands};
use threadchat::client::{AgentService, HttpAgentService};
use threadchat::config::ChatConfig;
use threadchat::error::ChatError;
use threadchat::session::{ChatSession, SessionManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e.display_message());
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let directives = cli.log_filter(std::env::var("RUST_LOG").ok().as_deref());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("threadchat=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), ChatError> {
    let config = ChatConfig::load(cli.config.as_deref(), cli.overrides())?;
    tracing::debug!(?config, "configuration loaded");

    // One client for the whole process; sessions share it.
    let service: Arc<dyn AgentService> = Arc::new(HttpAgentService::from_config(&config)?);
    let manager = SessionManager::from_config(service.clone(), &config);
    let mut stdout = std::io::stdout();

    match cli.command() {
        Commands::Ask(args) => run_ask(&manager, &args.prompt, &mut stdout).await,
        Commands::Chat => {
            let agent = service.get_agent(&config.agent_id).await?;
            let title = format!("{} (agent {})", agent.display_name(), agent.id);
            let mut chat = ChatSession::new(manager);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            run_chat(&mut chat, &title, stdin, &mut stdout).await
        }
    }
}
