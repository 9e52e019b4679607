//! # tilnet CLI
//!
//! Command-line interface for the tilnet "Today I Learned" publisher.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tilnet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, env = "TILNET_CONFIG", default_value = "tilnet.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new tilnet project
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// Load markdown notes into the database
    Ingest {
        /// Clear the database and re-render every entry
        #[arg(long)]
        full: bool,
    },

    /// Render the site from the current database
    Render,

    /// Ingest then render
    Build {
        /// Clear the database and re-render every entry
        #[arg(long)]
        full: bool,
    },

    /// Print the topic cloud
    Topics {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Parse all notes without writing anything and report diagnostics
    Verify {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => commands::init_project(path.as_deref()),
        Commands::Ingest { full } => commands::ingest_content(&cli.config, full),
        Commands::Render => commands::render_site(&cli.config),
        Commands::Build { full } => commands::build_site(&cli.config, full),
        Commands::Topics { json } => commands::list_topics(&cli.config, json),
        Commands::Verify { json } => commands::verify_site(&cli.config, json),
    }
}
