//! tbio: t-bio site tooling
//!
//! Main binary with subcommands:
//! - `migrate`: Run or list the data migrations
//! - `insert`: Insert JSON documents through the hook pipeline
//! - `serve`: Run the public HTTP endpoints

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod insert;
mod migrate;
mod serve;
mod site;

#[derive(Parser)]
#[command(name = "tbio")]
#[command(about = "t-bio site tooling", long_about = None)]
struct Cli {
    /// SQLite database path, or `:memory:` for a throwaway store
    #[arg(long, env = "TBIO_DB", default_value = "tbio.db", global = true)]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run data migrations
    Migrate {
        /// Migration name to run (default: every pending migration)
        #[arg(value_name = "MIGRATION")]
        migration: Option<String>,

        /// List registered migrations and whether they have run
        #[arg(long)]
        list: bool,

        /// Preview changes without applying (dry-run)
        #[arg(long)]
        dry_run: bool,

        /// Only run migrations registered as safe
        #[arg(long)]
        safe: bool,
    },

    /// Insert JSON documents through the hook pipeline
    Insert {
        /// File holding one document or an array of documents (`-` for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Insert as this user instead of anonymously
        #[arg(long, value_name = "USER_ID")]
        as_user: Option<String>,
    },

    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, env = "TBIO_LISTEN", default_value = "127.0.0.1:3000")]
        listen: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "tbio=info,tbio_profiles=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let site = site::Site::open(&cli.db)?;

    match cli.command {
        Commands::Migrate {
            migration,
            list,
            dry_run,
            safe,
        } => migrate::run_migrate_command(&site, migration.as_deref(), list, dry_run, safe).await,

        Commands::Insert { file, as_user } => {
            insert::run(&site, &file, as_user.as_deref()).await
        }

        Commands::Serve { listen } => serve::run(site, listen).await,
    }
}
