use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod clock;
mod commands;
mod config;
mod controllers;
mod error;
mod ids;
mod models;
mod render;
mod storage;
mod types;

pub(crate) use error::ApiResult;

use crate::clock::Clock;
use crate::config::Config;
use crate::controllers::paste::Pastes;
use crate::render::Pages;
use crate::storage::AnyStore;

/// Share text that disappears after a deadline or a number of reads.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Default)]
enum Command {
    /// Run the HTTP server.
    #[default]
    Serve,
    /// Check that the configured store is reachable.
    Ping,
}

#[derive(Clone, FromRef)]
pub struct App {
    pub config: Config,
    pub clock: Clock,
    pub store: AnyStore,
    pub pastes: Pastes<AnyStore>,
    pub pages: Arc<Pages>,
}

impl App {
    pub fn build(config: Config) -> anyhow::Result<Self> {
        let store = AnyStore::from_config(&config.store).context("failed to set up store")?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: AnyStore) -> anyhow::Result<Self> {
        let pastes =
            Pastes::new(store.clone()).with_max_attempts(config.limits.max_consume_attempts);
        let pages = Pages::new().context("failed to load page templates")?;

        Ok(App {
            clock: Clock::from_test_mode(config.test_mode),
            config,
            store,
            pastes,
            pages: Arc::new(pages),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // try to load .env, ignoring any errors
    _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let app = App::build(config)?;

    match cli.command.unwrap_or_default() {
        Command::Serve => commands::serve::run(app).await,
        Command::Ping => commands::ping::run(app).await,
    }
}
