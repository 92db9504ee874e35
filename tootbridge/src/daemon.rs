//! The polling loop.
//!
//! Each iteration runs one pass, persists, then sleeps for the poll interval. Both
//! the pass and the sleep race against the shutdown future; whichever way the loop
//! ends, the snapshot is written once more before returning.

use std::future::Future;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tootbridge_core::client::HttpClient;
use tootbridge_core::config::RelayConfig;
use tootbridge_core::director::{Director, PassReport};
use tootbridge_core::snapshot::SnapshotStore;
use tracing::{debug, error, info, warn};

/// Run passes until `shutdown` resolves.
pub async fn run_forever<S, F>(
    director: &mut Director<S>,
    config: &RelayConfig,
    shutdown: F,
) -> Result<()>
where
    S: SnapshotStore,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    info!("Tootbridge daemon started");

    let mut run: u64 = 0;
    loop {
        run += 1;
        debug!(run, "Run started");

        match HttpClient::new(config.request_timeout, config.resolve_timeout) {
            Ok(client) => {
                let report = tokio::select! {
                    report = director.run_pass(&client) => Some(report),
                    _ = &mut shutdown => None,
                };
                if report.is_none() {
                    warn!(run, "Shutdown requested during a pass, abandoning it");
                    return persist_on_shutdown(director).await;
                }
            }
            Err(e) => error!(run, error = %e, "Could not build HTTP client, skipping pass"),
        }

        if let Err(e) = director.persist().await {
            error!(run, error = %e, "Failed to persist snapshot");
        }

        let interrupted = tokio::select! {
            _ = sleep(config.poll_interval) => false,
            _ = &mut shutdown => true,
        };
        if interrupted {
            return persist_on_shutdown(director).await;
        }
    }
}

/// A single pass followed by a persist.
pub async fn sync_once<S>(director: &mut Director<S>, config: &RelayConfig) -> Result<PassReport>
where
    S: SnapshotStore,
{
    let client = HttpClient::new(config.request_timeout, config.resolve_timeout)?;
    let report = director
        .synchronize(&client)
        .await
        .context("Failed to persist snapshot after pass")?;
    Ok(report)
}

async fn persist_on_shutdown<S>(director: &Director<S>) -> Result<()>
where
    S: SnapshotStore,
{
    info!("Shutdown signal received, saving state");
    director
        .persist()
        .await
        .context("Failed to persist snapshot on shutdown")?;
    info!("Tootbridge daemon stopped");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
