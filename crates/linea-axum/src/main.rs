//! `linea-server` entry point.
//!
//! Loads `.env`, reads configuration from the environment and flags, then
//! serves the API or seeds the database.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use linea_axum::{ServerConfig, seed, start_server};

/// Linea store API server.
#[derive(Parser)]
#[command(name = "linea-server")]
#[command(about = "Serve the Linea store API")]
#[command(version)]
struct Cli {
    /// SQLite database file
    #[arg(long = "database", env = "DATABASE_PATH", global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (the default)
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Allowed CORS origin; repeat for several
        #[arg(long = "allow-origin")]
        allow_origins: Vec<String>,

        /// Seed demo data before serving
        #[arg(long)]
        seed: bool,
    },
    /// Insert the demo catalog and baseline exchange rates
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ServerConfig::from_env();
    if let Some(path) = cli.database {
        config = config.with_database_path(path);
    }

    match cli.command.unwrap_or(Command::Serve {
        port: None,
        allow_origins: Vec::new(),
        seed: false,
    }) {
        Command::Serve {
            port,
            allow_origins,
            seed,
        } => {
            if let Some(port) = port {
                config = config.with_port(port);
            }
            if !allow_origins.is_empty() {
                config = config.with_allowed_origins(allow_origins);
            }
            start_server(config.with_seed_on_start(seed)).await
        }
        Command::Seed => {
            let report = seed(&config).await?;
            println!(
                "Seeded {} categories, {} products, {} delivery options, {} rates",
                report.categories_created,
                report.products_created,
                report.delivery_options_created,
                report.rates_stored
            );
            Ok(())
        }
    }
}
