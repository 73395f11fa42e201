mod commands;
mod config;
mod events;
mod exchange;
mod message;
mod session;
#[cfg(test)]
mod testing;
mod transport;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "chatline")]
#[command(version)]
#[command(about = "Minimal terminal chat client for a remote inference endpoint", long_about = None)]
struct Cli {
    /// Chat endpoint to use instead of the configured one
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Check that the backend is up
    Ping,
    /// Show the effective configuration
    Config {
        /// Write the default configuration file if it does not exist
        #[arg(long)]
        init: bool,
    },
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "chatline=info".into())
}

/// The TUI owns the screen, so its log goes to a file under the config directory
fn init_file_logging() -> Result<()> {
    let dir = Config::home_dir()?;
    std::fs::create_dir_all(&dir).context("Failed to create .chatline directory")?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("chatline.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        None => init_file_logging()?,
        Some(_) => init_stderr_logging(),
    }

    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    match cli.command {
        None => commands::start_chat(config).await,
        Some(Commands::Ask { text }) => commands::ask(config, &text.join(" ")).await,
        Some(Commands::Ping) => commands::ping(config).await,
        Some(Commands::Config { init }) => commands::show_config(&config, init),
    }
}
