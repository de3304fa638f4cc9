//! Docshelf CLI
//!
//! Command-line interface for Docshelf - a personal library of remote documents.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use docshelf_core::{Config, DocType, ViewMode};

mod commands;
mod output;

use commands::Shelf;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "docshelf")]
#[command(about = "Docshelf - Search remote documents and keep a local library")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// JSON file with the remote catalog
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List library documents
    #[command(alias = "ls")]
    List {
        /// Only documents of this type (doc, wiki, sheet)
        #[arg(short = 't', long = "type")]
        doc_type: Option<DocType>,
    },
    /// Search the local library
    Search {
        /// Search query (empty lists everything)
        query: String,
    },
    /// Show a document
    Show {
        /// Document ID
        id: String,
        /// View mode (rich, source, plain)
        #[arg(short, long, default_value_t = ViewMode::Rich)]
        mode: ViewMode,
    },
    /// Show the heading outline of a document
    Outline {
        /// Document ID
        id: String,
    },
    /// Remove a document from the library
    #[command(alias = "rm")]
    Delete {
        /// Document ID
        id: String,
    },
    /// Search the remote catalog
    Remote {
        /// Search query
        query: String,
        /// Type filter (all, doc, wiki, sheet)
        #[arg(short = 't', long = "type")]
        doc_type: Option<String>,
    },
    /// Copy a remote result into the library
    Promote {
        /// Remote result ID
        id: String,
    },
    /// Pull the latest remote content into the library
    Refresh {
        /// Document ID (omit to refresh every document with a source)
        id: Option<String>,
    },
    /// Manage the access credential
    Credential {
        #[command(subcommand)]
        command: Option<CredentialCommands>,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum CredentialCommands {
    /// Show the saved credential and its status
    Show,
    /// Save and validate a credential
    Set {
        /// Credential value
        value: String,
    },
    /// Validate the saved credential
    Validate,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config);

    // Config doesn't need the library
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(&config, &output),
        };
    }

    let shelf = Shelf::open(config, cli.catalog)?;
    debug!("Opened library with {} document(s)", shelf.library.len());

    match cli.command {
        Commands::List { doc_type } => commands::document::list(&shelf, doc_type, &output),
        Commands::Search { query } => commands::document::search(&shelf, query, &output),
        Commands::Show { id, mode } => commands::document::show(&shelf, id, mode, &output),
        Commands::Outline { id } => commands::document::outline(&shelf, id, &output),
        Commands::Delete { id } => commands::document::delete(&shelf, id, &output),
        Commands::Remote { query, doc_type } => {
            commands::remote::search(&shelf, query, doc_type, &output).await
        }
        Commands::Promote { id } => commands::remote::promote(&shelf, id, &output).await,
        Commands::Refresh { id } => commands::remote::refresh(&shelf, id, &output).await,
        Commands::Credential { command } => handle_credential_command(command, &shelf, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

async fn handle_credential_command(
    command: Option<CredentialCommands>,
    shelf: &Shelf,
    output: &Output,
) -> Result<()> {
    match command {
        Some(CredentialCommands::Show) | None => commands::credential::show(shelf, output),
        Some(CredentialCommands::Set { value }) => {
            commands::credential::set(shelf, value, output).await
        }
        Some(CredentialCommands::Validate) => commands::credential::validate(shelf, output).await,
    }
}

/// Install stderr logging filtered to the docshelf crates
fn init_logging(config: &Config) {
    let level = &config.log_level;
    let env_filter = EnvFilter::new(format!("docshelf_core={},docshelf_cli={}", level, level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
