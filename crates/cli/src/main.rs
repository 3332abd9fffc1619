//! Nakshatra CLI: the main entry point.
//!
//! Commands:
//! - `gateway`: Start the HTTP API server
//! - `ingest`: Load the astrology corpus into the knowledge store
//! - `chart`: Compute and print a kundali
//! - `chat`: Run one consultation turn against a local session
//! - `config`: Show or print configuration
//! - `doctor`: Check every external collaborator

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "nakshatra",
    about = "Nakshatra — conversational Vedic astrology assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to ~/.nakshatra/config.toml)
    #[arg(short, long, global = true, env = "NAKSHATRA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Gateway {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ingest the astrology corpus into the knowledge store
    Ingest {
        /// Directory holding the JSON and text source files
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Drop every stored document before ingesting
        #[arg(long)]
        recreate: bool,

        /// Documents per upsert call
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Compute a kundali and print it as JSON
    Chart {
        #[command(flatten)]
        profile: commands::BirthArgs,
    },

    /// Send one message in a locally stored session
    Chat {
        /// Session to continue or start
        #[arg(short, long, default_value = "cli")]
        session: String,

        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Birth details, required only when the session is new
        #[command(flatten)]
        profile: commands::OptionalBirthArgs,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check configuration and every external collaborator
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the default configuration as TOML
    Default,
    /// Print the config file path
    Path,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Gateway { host, port } => commands::gateway::run(config_path, host, port).await?,
        Commands::Ingest {
            data_dir,
            recreate,
            batch_size,
        } => commands::ingest::run(config_path, data_dir, recreate, batch_size).await?,
        Commands::Chart { profile } => commands::chart::run(config_path, profile.into_profile()?).await?,
        Commands::Chat {
            session,
            message,
            profile,
        } => commands::chat::run(config_path, &session, &message, profile.into_profile()?).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Default => commands::config_cmd::print_default(),
            ConfigAction::Path => commands::config_cmd::path(config_path),
        },
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
