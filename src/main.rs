//! learn-in-five - LearnInFive terminal client
//!
//! Computer science concepts explained like you're five. Fetches short
//! explanations from the LearnInFive API and, once signed in, keeps a
//! history of the ones you save.

mod app;
mod config;
mod error;
mod models;
mod screens;
mod services;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// learn-in-five - CS concepts explained like you're five
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Config file path (default: ~/.config/learn-in-five/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// API base URL (overrides config and LEARNINFIVE_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Clear the saved session and exit
    #[arg(long)]
    logout: bool,
}

/// Send logs to a file; the terminal belongs to the TUI.
fn init_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        "learn_in_five=debug,info"
    } else {
        "learn_in_five=info,warn"
    };

    let log_path = config::Config::log_path();
    if let Some(dir) = log_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.debug)?;

    // Load configuration
    let mut config = if let Some(path) = args.config {
        config::Config::from_file(&path)?
    } else {
        config::Config::load()?
    };
    config.apply_env();

    // Override API URL if specified
    if let Some(api_url) = args.api_url {
        config.api.base_url = api_url;
    }

    if args.logout {
        services::SessionStore::open(config.session_path()).logout()?;
        println!("Signed out.");
        return Ok(());
    }

    tracing::info!("Using API at {}", config.api.base_url);

    // Run the TUI application
    let mut app = app::App::new(config)?;
    app.run().await
}
