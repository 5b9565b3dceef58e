// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Vault command line
//!
//! Syncs Strava activities into a local folder of Markdown notes.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use strava_vault::{
    config::{Config, JsonFileStore},
    services::{Command, StravaClient, SyncService, SystemBrowser},
    vault::fs::FsVault,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "strava-vault", version, about = "Sync Strava activities into Markdown notes")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Open the Strava authorization page
    Authenticate,
    /// Finish authorization with the redirect URI from Strava
    CompleteAuth {
        /// e.g. obsidian://strava-sync?code=...&scope=read,activity:read_all
        uri: String,
    },
    /// Sync activities since the last run
    Sync,
    /// Rewrite notes for the whole activity history
    ForceSync,
    /// Fetch the detailed activity behind a note
    Detail {
        /// Vault-relative path of the activity note
        note_path: String,
    },
}

impl From<CliCommand> for Command {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Authenticate => Command::Authenticate,
            CliCommand::CompleteAuth { uri } => Command::CompleteAuth(uri),
            CliCommand::Sync => Command::Sync,
            CliCommand::ForceSync => Command::ForceSync,
            CliCommand::Detail { note_path } => Command::Detail(note_path),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Structured JSON logs on stderr, command output on stdout
    init_logging()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        vault = %config.vault_path.display(),
        settings = %config.settings_path.display(),
        "Starting Strava-Vault"
    );

    let store = Arc::new(JsonFileStore::new(&config.settings_path));
    let vault = Arc::new(FsVault::new(&config.vault_path));
    let strava = Arc::new(StravaClient::with_base_urls(
        &config.api_base_url,
        &config.oauth_base_url,
    ));

    let service = SyncService::load(&config, store, vault, strava)
        .await
        .context("Failed to load settings")?;

    match service.execute(cli.command.into(), &SystemBrowser).await {
        Ok(message) => {
            println!("{}", message);
            Ok(ExitCode::SUCCESS)
        }
        Err(message) => {
            eprintln!("{}", message);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strava_vault=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
