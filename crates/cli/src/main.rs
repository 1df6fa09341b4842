//! Quill CLI
//!
//! Main entry point for the quill command-line tool.
//! Resolves prompt documents, runs dialog chains and structures model output.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    ChainCommand, ListCommand, ResolveCommand, SectionsCommand, TemplatesCommand,
};
use quill_core::logging::{self, LogFormat};
use quill_core::AppConfig;
use std::path::PathBuf;

/// Quill - prompt documents resolved by language models
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Resolve prompt documents with language models", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "QUILL_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "QUILL_CONFIG")]
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

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// LLM provider (openai, ollama, echo)
    #[arg(short, long, global = true, env = "QUILL_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "QUILL_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a prompt document or template
    Resolve(ResolveCommand),

    /// Run a dialog chain described in YAML
    Chain(ChainCommand),

    /// Extract list items from text
    List(ListCommand),

    /// Split markdown text into heading sections
    Sections(SectionsCommand),

    /// List prompt templates in the workspace
    Templates(TemplatesCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Resolve(_) => "resolve",
            Commands::Chain(_) => "chain",
            Commands::List(_) => "list",
            Commands::Sections(_) => "sections",
            Commands::Templates(_) => "templates",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration, reading the config file the flags point at
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

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("Quill CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Resolve(cmd) => cmd.execute(&config).await,
        Commands::Chain(cmd) => cmd.execute(&config).await,
        Commands::List(cmd) => cmd.execute(),
        Commands::Sections(cmd) => cmd.execute(),
        Commands::Templates(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
