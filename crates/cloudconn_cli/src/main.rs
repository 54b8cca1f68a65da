//! cloudconn CLI
//!
//! Command-line client for the unified storage and database facade.
//!
//! # Commands
//!
//! - `put` / `get` / `delete` - Store, fetch and remove objects
//! - `ls` - List objects under a prefix
//! - `cp` / `mv` - Copy and move objects within the store
//! - `read` / `write` - Fetch and store table records
//! - `query` - Query a table with equality conditions

mod commands;

use clap::{Parser, Subcommand};
use cloudconn_core::ProviderId;
use commands::CliError;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Unified cloud storage and database client.
#[derive(Parser)]
#[command(name = "cloudconn")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Provider to use, overriding the configuration (aws, gcp, local).
    /// This build ships no AWS or GCP client, so only local connects.
    #[arg(global = true, short, long)]
    provider: Option<ProviderId>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a local file as an object
    Put {
        /// Object key
        key: String,
        /// File to upload
        file: PathBuf,
    },

    /// Fetch an object
    Get {
        /// Object key
        key: String,
        /// Write to this file instead of standard output
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Delete an object
    Delete {
        /// Object key
        key: String,
    },

    /// List objects
    Ls {
        /// Key prefix
        #[arg(default_value = "")]
        prefix: String,
        /// Show object sizes
        #[arg(short, long)]
        sizes: bool,
    },

    /// Copy an object
    Cp {
        /// Source key
        source: String,
        /// Destination key
        destination: String,
    },

    /// Move an object
    Mv {
        /// Source key
        source: String,
        /// Destination key
        destination: String,
    },

    /// Print a record as JSON
    Read {
        /// Table name
        table: String,
        /// Record key
        key: String,
    },

    /// Store a record given as a JSON object
    Write {
        /// Table name
        table: String,
        /// Record key
        key: String,
        /// Record fields, e.g. '{"name": "Ada"}'
        json: String,
    },

    /// Query a table, printing one JSON row per line
    Query {
        /// Table name
        table: String,
        /// Equality condition FIELD=VALUE; VALUE is parsed as JSON when possible
        #[arg(short = 'w', long = "where", value_parser = commands::parse_condition)]
        conditions: Vec<(String, Value)>,
        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    let connector = commands::connect(cli.config.as_deref(), cli.provider)?;
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Put { key, file } => commands::objects::put(&connector, &key, &file)?,
        Commands::Get { key, out } => {
            commands::objects::get(&connector, &key, out.as_deref(), &mut stdout)?;
        }
        Commands::Delete { key } => commands::objects::delete(&connector, &key)?,
        Commands::Ls { prefix, sizes } => {
            commands::objects::ls(&connector, &prefix, sizes, &mut stdout)?;
        }
        Commands::Cp {
            source,
            destination,
        } => commands::objects::cp(&connector, &source, &destination)?,
        Commands::Mv {
            source,
            destination,
        } => commands::objects::mv(&connector, &source, &destination)?,
        Commands::Read { table, key } => {
            commands::records::read(&connector, &table, &key, &mut stdout)?;
        }
        Commands::Write { table, key, json } => {
            commands::records::write(&connector, &table, &key, &json)?;
        }
        Commands::Query {
            table,
            conditions,
            limit,
        } => commands::records::query(&connector, &table, conditions, limit, &mut stdout)?,
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cloudconn", "ls", "docs/", "--sizes", "-p", "gcp"]).unwrap();
        assert_eq!(cli.provider, Some(ProviderId::Gcp));
        assert!(matches!(
            cli.command,
            Commands::Ls { ref prefix, sizes: true } if prefix == "docs/"
        ));
    }

    #[test]
    fn parses_repeated_conditions() {
        let cli = Cli::try_parse_from([
            "cloudconn", "query", "people", "--where", "team=red", "-w", "age=30", "--limit", "5",
        ])
        .unwrap();
        let Commands::Query {
            conditions, limit, ..
        } = cli.command
        else {
            panic!("expected query");
        };
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[1], ("age".to_string(), serde_json::json!(30)));
        assert_eq!(limit, Some(5));
    }

    #[test]
    fn provider_help_says_only_local_connects() {
        let command = Cli::command();
        let provider = command
            .get_arguments()
            .find(|arg| arg.get_id() == "provider")
            .unwrap();
        let help = provider.get_help().unwrap().to_string();
        assert!(help.contains("only local connects"));
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(Cli::try_parse_from(["cloudconn", "-p", "azure", "ls"]).is_err());
    }
}
