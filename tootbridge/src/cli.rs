///
/// This module implements the CLI interface for tootbridge: command parsing,
/// startup wiring and the two entrypoints (`run`, `sync`).
///
/// All relay logic (bridges, watermarks, text preparation, persistence) lives in
/// the [`tootbridge-core`] crate. This module only assembles it from configuration.
///
/// ## How To Use
/// - `tootbridge run` polls forever until SIGINT/SIGTERM.
/// - `tootbridge sync` runs a single pass and exits, for cron-style scheduling.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`tootbridge-core`]: ../../tootbridge-core/
use crate::daemon::{run_forever, shutdown_signal, sync_once};
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tootbridge_core::director::Director;
use tootbridge_core::snapshot::JsonFileSnapshot;
use tootbridge_core::text::TextPreparer;

/// CLI for tootbridge: relay Twitter accounts to Mastodon.
#[derive(Parser)]
#[clap(
    name = "tootbridge",
    version,
    about = "Relay new posts from Twitter accounts to Mastodon accounts"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll all bridges forever, persisting state after every pass and on shutdown
    Run {
        /// Path to the credentials snapshot (overrides CREDENTIALS_PATH)
        #[clap(long)]
        credentials: Option<PathBuf>,
    },
    /// Run a single pass over all bridges, persist state and exit
    Sync {
        /// Path to the credentials snapshot (overrides CREDENTIALS_PATH)
        #[clap(long)]
        credentials: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    let (credentials, single_pass) = match cli.command {
        Commands::Run { credentials } => (credentials, false),
        Commands::Sync { credentials } => (credentials, true),
    };

    let config = load_config(credentials)?;
    config.trace_loaded();

    let store = JsonFileSnapshot::new(&config.credentials_path);
    let mut director = Director::load(
        store,
        &config.source_endpoint,
        TextPreparer::new(&config.text),
    )
    .await
    .with_context(|| {
        format!(
            "Invalid credentials snapshot '{}'",
            config.credentials_path.display()
        )
    })?;

    if single_pass {
        let report = sync_once(&mut director, &config).await?;
        tracing::info!(command = "sync", ?report, "Synchronisation complete");
        Ok(())
    } else {
        run_forever(&mut director, &config, shutdown_signal()).await
    }
}
