use anyhow::Result;
use chronicle::{cli, config, server};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "chronicle",
    version,
    about = "Salience-aware archive engine and MCP server for AI conversations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the archive over MCP stdio (the decay scheduler runs alongside)
    Serve,
    /// Apply the idempotent schema migration and exit
    Migrate,
    /// Run one manual decay cycle and print the report
    Decay,
    /// Check database connectivity, extensions, and schema health
    Doctor,
}

/// Wire tracing to stderr at the requested level; an unparseable level
/// falls back to `info`. Stdout is reserved for the MCP JSON-RPC stream.
fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::ChronicleConfig::load()?;
    init_tracing(&config.server.log_level);

    match cli.command {
        Command::Serve => server::serve_stdio(config).await?,
        Command::Migrate => cli::migrate(&config).await?,
        Command::Decay => cli::decay::run_once(&config).await?,
        Command::Doctor => cli::doctor::doctor(&config).await?,
    }

    Ok(())
}
