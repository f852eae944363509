//! Agora command-line client: session, starred debates and reading progress.

mod app;
mod auth;
mod console;
mod user_data;

use std::path::PathBuf;

use agora_config_and_utils::{init_logging, Config, Paths};
use clap::{Parser, Subcommand};

/// Agora command-line interface.
#[derive(Parser)]
#[command(name = "agora")]
#[command(about = "Browse debates: stars, reading progress and account sync")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (config, database, logs). Defaults to ~/.agora
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and push local stars and progress to the account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AGORA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log out and clear cached data
    Logout,
    /// Show session and data status
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Star a debate
    Star { debate: i64 },
    /// Remove a star
    Unstar { debate: i64 },
    /// List starred debates
    Starred,
    /// Show reading progress for a debate
    Progress { debate: i64 },
    /// Mark points of a debate as seen
    Seen {
        debate: i64,
        #[arg(required = true)]
        points: Vec<i64>,
        /// Number of points in the debate
        #[arg(long)]
        total: u32,
    },
    /// Push local data to the account and reload it
    Sync,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    // Initialize logging
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, Some(&paths));

    let state = app::init(config, paths).await?;

    match cli.command {
        Commands::Login { email, password } => {
            let password = password.ok_or(app::CommandError::MissingPassword)?;
            auth::login(&state, &email, &password).await?;
        }
        Commands::Logout => auth::logout(&state).await?,
        Commands::Status { json } => auth::status(&state, json)?,
        Commands::Star { debate } => user_data::set_star(&state, debate, true).await?,
        Commands::Unstar { debate } => user_data::set_star(&state, debate, false).await?,
        Commands::Starred => user_data::list_starred(&state),
        Commands::Progress { debate } => user_data::show_progress(&state, debate),
        Commands::Seen {
            debate,
            points,
            total,
        } => user_data::mark_seen(&state, debate, &points, total).await?,
        Commands::Sync => user_data::sync(&state).await?,
    }

    Ok(())
}
