//! CLI entrypoint for safra
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, bail};
use clap::Parser;
use safra_application::{ChatService, SessionOverride};
use safra_infrastructure::{
    ConfigLoader, FileSessionDirectory, HttpChatBackend, JsonlConversationLogger,
};
use safra_presentation::{ChatRepl, Cli, ConsoleNotifier};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };

    info!("Starting safra against {}", config.backend.base_url);

    // === Dependency Injection ===
    let backend = Arc::new(HttpChatBackend::new(&config.backend)?);

    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("safra");
    let directory = Arc::new(FileSessionDirectory::open(data_dir.join("sessions.json")));

    let mut service = ChatService::new(backend)
        .with_notifier(Arc::new(ConsoleNotifier::new(cli.quiet)))
        .with_session_directory(directory.clone());

    if config.logging.conversation_log {
        if let Some(logger) = JsonlConversationLogger::new(data_dir.join("exchanges.jsonl")) {
            service = service.with_conversation_logger(Arc::new(logger));
        }
    }
    let service = Arc::new(service);

    // Seed the session: explicit flag wins, then the stored latest, unless a
    // fresh conversation was requested
    if let Some(session_id) = cli.session.clone() {
        service.set_active_context(Some(session_id.clone()));
        service.set_session_id(Some(session_id));
    } else if !cli.new_session {
        if let Some(session_id) = directory.latest() {
            service.set_active_context(Some(session_id.clone()));
            service.set_session_id(Some(session_id));
        }
    }

    // Chat mode
    if cli.chat {
        let repl = ChatRepl::new(service).with_banner(!cli.quiet);
        repl.run().await?;
        return Ok(());
    }

    // Single message mode - message is required
    let message = match cli.message {
        Some(m) => m,
        None => bail!("Message is required. Use --chat for interactive mode."),
    };

    let override_ = if cli.new_session {
        SessionOverride::Fresh
    } else {
        SessionOverride::Inherit
    };

    let outcome = service.send(&message, None, override_).await;

    if let Some(session_id) = outcome.redirect_to {
        if !cli.quiet {
            eprintln!("(session {})", session_id);
        }
    }

    // The error already reached the console through the notifier; reflect it
    // in the exit code
    if service.last_error().is_some() {
        std::process::exit(1);
    }

    Ok(())
}
