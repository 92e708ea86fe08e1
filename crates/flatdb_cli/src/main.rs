//! FlatDB CLI
//!
//! Command-line access to flat-file key-value databases.
//!
//! # Commands
//!
//! - `drivers` - List available drivers and their capabilities
//! - `get` - Print the value(s) stored under a key
//! - `set` / `add` / `delete` - Modify a key
//! - `dump` - Print every stored pair
//! - `optimize` - Compact the database file

mod commands;

use clap::{Parser, Subcommand};
use commands::edit::Edit;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// FlatDB command-line database tools.
#[derive(Parser)]
#[command(name = "flatdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Engine driver
    #[arg(global = true, short, long, default_value = flatdb_core::DEFAULT_DRIVER)]
    driver: String,

    /// Namespace for key operations
    #[arg(global = true, short, long, default_value = "")]
    namespace: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available drivers
    Drivers {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the value stored under a key
    Get {
        /// Key to look up
        key: String,

        /// Print every value stored under the key
        #[arg(short, long)]
        all: bool,
    },

    /// Set the first value of a key
    Set {
        /// Key to write
        key: String,
        /// Value to store
        value: String,
    },

    /// Add a value under a key
    Add {
        /// Key to write
        key: String,
        /// Value to store
        value: String,
    },

    /// Remove every value of a key
    Delete {
        /// Key to remove
        key: String,
    },

    /// Print every stored pair
    Dump {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Compact the database file
    Optimize,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let driver = cli.driver.as_str();
    let namespace = cli.namespace.as_str();

    match &cli.command {
        Commands::Drivers { format } => commands::drivers::run(format)?,
        Commands::Get { key, all } => {
            let path = cli.path.as_deref().ok_or("Database path required for get")?;
            commands::get::run(path, driver, namespace, key, *all)?;
        }
        Commands::Set { key, value } => {
            let path = cli.path.as_deref().ok_or("Database path required for set")?;
            commands::edit::run(path, driver, namespace, key, Edit::Set(value))?;
        }
        Commands::Add { key, value } => {
            let path = cli.path.as_deref().ok_or("Database path required for add")?;
            commands::edit::run(path, driver, namespace, key, Edit::Add(value))?;
        }
        Commands::Delete { key } => {
            let path = cli.path.as_deref().ok_or("Database path required for delete")?;
            commands::edit::run(path, driver, namespace, key, Edit::Delete)?;
        }
        Commands::Dump { format } => {
            let path = cli.path.as_deref().ok_or("Database path required for dump")?;
            commands::dump::run(path, driver, namespace, format)?;
        }
        Commands::Optimize => {
            let path = cli.path.as_deref().ok_or("Database path required for optimize")?;
            commands::optimize::run(path, driver)?;
        }
        Commands::Version => {
            println!("FlatDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "Drivers: {}",
                flatdb_core::list_drivers().into_iter().collect::<Vec<_>>().join(", ")
            );
        }
    }

    Ok(())
}
