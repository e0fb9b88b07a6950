//! DRIVE Energy CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! drive-cli migrate
//!
//! # Load the bundled catalog and discount codes
//! drive-cli seed
//!
//! # Load a custom catalog, overwriting existing rows
//! drive-cli seed --file catalog.yaml --overwrite
//!
//! # Grant or revoke the admin role
//! drive-cli admin grant -e admin@drive-energy.cz
//! drive-cli admin revoke -e admin@drive-energy.cz
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "drive-cli")]
#[command(author, version, about = "DRIVE Energy storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed products and discount codes
    Seed {
        /// Catalog YAML file; the bundled catalog is used when omitted
        #[arg(short, long)]
        file: Option<String>,

        /// Update rows that already exist instead of skipping them
        #[arg(long)]
        overwrite: bool,
    },
    /// Manage admin roles
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an existing account the admin role
    Grant {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Demote an admin back to customer
    Revoke {
        /// Account email address
        #[arg(short, long)]
        email: String,
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
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { file, overwrite } => {
            commands::seed::catalog(file.as_deref(), overwrite).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::set_admin(&email, true).await?,
            AdminAction::Revoke { email } => commands::admin::set_admin(&email, false).await?,
        },
    }
    Ok(())
}
