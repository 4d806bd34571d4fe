//! openSAMPL CLI
//!
//! Command-line surface for loading probe data.
//!
//! # Commands
//!
//! - `init` - Create the database schema and seed reference data
//! - `config show` - Inspect the active configuration
//! - `load table` - Write rows to a known table from a file or inline YAML/JSON
//! - `load adva` / `load twst` - Parse and load a vendor probe export

mod commands;

use clap::{Args, Parser, Subcommand};
use load::config::Config;
use load::vendors::Vendor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// openSAMPL probe data loading tools.
#[derive(Parser)]
#[command(name = "opensampl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and seed reference data
    Init,

    /// Inspect the active configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Load data directly or through the backend
    Load {
        #[command(subcommand)]
        command: LoadCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print configuration variables and their current values
    Show {
        /// Show a single variable
        #[arg(long)]
        var: Option<String>,

        /// Include each variable's description
        #[arg(long)]
        explain: bool,
    },
}

#[derive(Subcommand)]
enum LoadCommands {
    /// Write rows to a table from a file or an inline YAML/JSON string
    Table {
        /// Target table name
        table: String,

        /// Path to a YAML/JSON file, or the payload itself
        payload: String,

        /// Conflict policy: update, error, replace or ignore
        #[arg(long, default_value = "update")]
        if_exists: String,
    },

    /// Load an ADVA clock-probe export
    Adva(VendorArgs),

    /// Load a Microchip TWST modem export
    Twst(VendorArgs),
}

#[derive(Args)]
struct VendorArgs {
    /// Path to the export file
    file: PathBuf,

    /// Load only the header metadata
    #[arg(long)]
    metadata: bool,

    /// Load only the time series
    #[arg(long)]
    time_data: bool,

    /// Leave the input file in place after loading
    #[arg(long)]
    no_archive: bool,

    /// Readings per insert statement
    #[arg(long)]
    chunk_size: Option<usize>,
}

impl From<VendorArgs> for commands::load::VendorLoad {
    fn from(args: VendorArgs) -> Self {
        Self {
            file: args.file,
            metadata: args.metadata,
            time_data: args.time_data,
            no_archive: args.no_archive,
            chunk_size: args.chunk_size,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env();

    match cli.command {
        Commands::Init => commands::init::run(&config).await,
        Commands::Config {
            command: ConfigCommands::Show { var, explain },
        } => commands::config::show(&config, var.as_deref(), explain),
        Commands::Load { command } => match command {
            LoadCommands::Table {
                table,
                payload,
                if_exists,
            } => commands::load::table(&config, &table, &payload, &if_exists).await,
            LoadCommands::Adva(args) => {
                commands::load::vendor(&config, Vendor::Adva, args.into()).await
            }
            LoadCommands::Twst(args) => {
                commands::load::vendor(&config, Vendor::MicrochipTwst, args.into()).await
            }
        },
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
    fn parses_load_table_arguments() {
        let cli = Cli::parse_from([
            "opensampl",
            "load",
            "table",
            "locations",
            r#"{"name": "site"}"#,
            "--if-exists",
            "replace",
        ]);
        let Commands::Load {
            command:
                LoadCommands::Table {
                    table,
                    payload,
                    if_exists,
                },
        } = cli.command
        else {
            panic!("expected load table");
        };
        assert_eq!(table, "locations");
        assert_eq!(payload, r#"{"name": "site"}"#);
        assert_eq!(if_exists, "replace");
    }

    #[test]
    fn vendor_flags_default_to_loading_everything() {
        let cli = Cli::parse_from(["opensampl", "load", "adva", "export.txt"]);
        let Commands::Load {
            command: LoadCommands::Adva(args),
        } = cli.command
        else {
            panic!("expected load adva");
        };
        assert!(!args.metadata);
        assert!(!args.time_data);
        assert!(!args.no_archive);
        assert_eq!(args.chunk_size, None);
    }
}
