//! Atelier CLI - session store and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! atelier migrate
//!
//! # Load products from a YAML file into the backend
//! atelier seed products.yaml
//!
//! # List the catalog, filtered like the storefront does
//! atelier catalog --q vase --cat sculptures
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create the `tower-sessions` table in `PostgreSQL`
//! - `seed` - Bulk insert products through `POST /products`
//! - `catalog` - Print the filtered product list

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(author, version, about = "Atelier storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session store table
    Migrate,
    /// Seed the backend catalog from a YAML file
    Seed {
        /// Path to a YAML list of products
        file: String,
    },
    /// List the catalog
    Catalog {
        /// Case-insensitive name filter
        #[arg(short, long)]
        q: Option<String>,

        /// Category key (`all` for every category)
        #[arg(short, long)]
        cat: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::session_store().await?,
        Commands::Seed { file } => commands::seed::products(&file).await?,
        Commands::Catalog { q, cat } => commands::catalog::list(q, cat).await?,
    }
    Ok(())
}
