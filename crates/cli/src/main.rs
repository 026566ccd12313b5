//! MediGuide CLI
//!
//! Main entry point for the mediguide command-line tool.
//! Builds the medical document index and serves the chat endpoint.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, IngestCommand, ServeCommand, StatsCommand};
use mediguide_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// MediGuide - a medical assistant answering from your own documents
#[derive(Parser, Debug)]
#[command(name = "mediguide")]
#[command(about = "Medical question answering over a local PDF index", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "MEDIGUIDE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "MEDIGUIDE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (gemini, ollama)
    #[arg(short, long, global = true, env = "MEDIGUIDE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "MEDIGUIDE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the chat page and the question endpoint
    Serve(ServeCommand),

    /// Build the vector index from PDF documents
    Ingest(IngestCommand),

    /// Ask a single question from the command line
    Ask(AskCommand),

    /// Show vector index statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration from the selected workspace and config file
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("MediGuide CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("LLM: {} / {}", config.llm.provider, config.llm.model);
    tracing::debug!(
        "Embeddings: {} / {}",
        config.embedding.provider,
        config.embedding.model
    );

    // Stats only reads the index file; ingest never calls the LLM
    match cli.command {
        Commands::Serve(_) | Commands::Ask(_) => config.validate_serving()?,
        Commands::Ingest(_) => config.validate()?,
        Commands::Stats(_) => {}
    }

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
