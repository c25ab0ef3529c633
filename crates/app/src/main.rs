//! Uniroad — streaming education-advisory chat client.
//!
//! One conversation, one duplex stream per message, everything
//! persisted locally in SQLite.

mod academic;
mod chat;
mod cmd_chat;
mod cmd_profile;
mod cmd_sessions;
mod cmd_upload;
mod config;
mod error;
mod fallback;
mod interpreter;
mod logging;
mod migration_runner;
mod resolver;
mod store;
mod stream;
mod summarize;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::store::SqliteStore;

#[derive(Parser)]
#[command(name = "uniroad", about = "진로·입시 상담 챗 클라이언트", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start (or resume) an advisory chat
    Chat {
        /// Resume an existing session by id
        #[arg(long)]
        session: Option<String>,
    },
    /// List past conversations
    Sessions,
    /// Upload a school-record PDF for analysis
    Upload {
        file: PathBuf,
        /// Email to associate with the upload
        #[arg(long)]
        email: Option<String>,
    },
    /// Manage the profile context sent with chat requests
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Import a profile JSON file
    Import { file: PathBuf },
    /// Print the stored profile
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _logging = logging::init_logging()?;
    let cli = Cli::parse();
    let config = Config::load()?;

    let store = Arc::new(SqliteStore::open(config.db_path()).await?);

    match cli.command {
        Command::Chat { session } => cmd_chat::run(config, store, session).await,
        Command::Sessions => cmd_sessions::run(config, store).await,
        Command::Upload { file, email } => cmd_upload::run(config, &file, email).await,
        Command::Profile { action } => match action {
            ProfileAction::Import { file } => cmd_profile::import(config, store, &file).await,
            ProfileAction::Show => cmd_profile::show(config, store).await,
        },
    }
}
