//! Owner of all bridges and of their persisted state.
//!
//! The director is built once at startup from the snapshot, then drives passes:
//! every bridge synchronizes concurrently against one shared client, and the
//! resulting watermarks are written back through the [`SnapshotStore`].
//!
//! The fan-out is cooperative (`join_all` on the calling task), not parallel.
//! Bridges share no mutable state, so nothing is locked.

use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{info, instrument};

use crate::bridge::{Bridge, BridgeReport};
use crate::contract::{LinkResolver, SourceFeed, StatusPoster};
use crate::snapshot::{BridgeRecord, SnapshotError, SnapshotStore};
use crate::text::TextPreparer;

/// Summary of one pass over all bridges.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub bridges: Vec<BridgeReport>,
    pub duration: Duration,
}

impl PassReport {
    pub fn posted(&self) -> usize {
        self.bridges.iter().map(|b| b.posted).sum()
    }

    pub fn failed(&self) -> usize {
        self.bridges.iter().map(|b| b.failed).sum()
    }
}

pub struct Director<S> {
    bridges: Vec<Bridge>,
    store: S,
    preparer: TextPreparer,
}

impl<S> Director<S>
where
    S: SnapshotStore,
{
    /// Build all bridges from the stored snapshot. Fails if there is none.
    pub async fn load(
        store: S,
        source_endpoint: &str,
        preparer: TextPreparer,
    ) -> Result<Self, SnapshotError> {
        let records = store.load().await?;
        if records.is_empty() {
            return Err(SnapshotError::Empty);
        }
        let bridges: Vec<Bridge> = records
            .into_iter()
            .map(|record| Bridge::from_record(record, source_endpoint))
            .collect();
        info!(bridges = bridges.len(), "Loaded up bridges");
        Ok(Self {
            bridges,
            store,
            preparer,
        })
    }

    pub fn bridges(&self) -> &[Bridge] {
        &self.bridges
    }

    pub fn records(&self) -> Vec<BridgeRecord> {
        self.bridges.iter().map(Bridge::to_record).collect()
    }

    /// Synchronize every bridge concurrently and wait for all of them.
    ///
    /// Dropping the returned future mid-pass is safe: watermarks already
    /// advanced stay advanced and are picked up by the next [`persist`](Self::persist).
    #[instrument(skip_all, fields(bridges = self.bridges.len()))]
    pub async fn run_pass<C>(&mut self, client: &C) -> PassReport
    where
        C: SourceFeed + StatusPoster + LinkResolver,
    {
        let started = Instant::now();
        info!("Synchronizing accounts");

        let preparer = &self.preparer;
        let reports = join_all(
            self.bridges
                .iter_mut()
                .map(|bridge| bridge.synchronize(client, preparer)),
        )
        .await;

        let report = PassReport {
            bridges: reports,
            duration: started.elapsed(),
        };
        info!(
            posted = report.posted(),
            failed = report.failed(),
            duration_ms = report.duration.as_millis() as u64,
            "Run finished"
        );
        report
    }

    /// Write the current state of every bridge to the snapshot.
    pub async fn persist(&self) -> Result<(), SnapshotError> {
        self.store.save(&self.records()).await?;
        info!("Updated credentials data");
        Ok(())
    }

    /// One pass followed by a persist.
    pub async fn synchronize<C>(&mut self, client: &C) -> Result<PassReport, SnapshotError>
    where
        C: SourceFeed + StatusPoster + LinkResolver,
    {
        let report = self.run_pass(client).await;
        self.persist().await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MockSnapshotStore;

    fn record(account: &str, watermark: u64) -> BridgeRecord {
        BridgeRecord {
            source_account: account.into(),
            destination_endpoint: "https://dest.example".into(),
            watermark,
            destination_credential: "token".into(),
        }
    }

    #[tokio::test]
    async fn load_builds_one_bridge_per_record() {
        let mut store = MockSnapshotStore::new();
        store
            .expect_load()
            .returning(|| Ok(vec![record("a", 1), record("b", 2)]));

        let director = Director::load(store, "https://src.example", TextPreparer::default())
            .await
            .unwrap();
        let accounts: Vec<&str> = director
            .bridges()
            .iter()
            .map(Bridge::source_account)
            .collect();
        assert_eq!(accounts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn load_fails_on_empty_snapshot() {
        let mut store = MockSnapshotStore::new();
        store.expect_load().returning(|| Ok(vec![]));

        let result = Director::load(store, "https://src.example", TextPreparer::default()).await;
        assert!(matches!(result, Err(SnapshotError::Empty)));
    }

    #[tokio::test]
    async fn persist_writes_records_in_bridge_order() {
        let mut store = MockSnapshotStore::new();
        store
            .expect_load()
            .returning(|| Ok(vec![record("a", 1), record("b", 2)]));
        store
            .expect_save()
            .withf(|records| records == [record("a", 1), record("b", 2)])
            .times(1)
            .returning(|_| Ok(()));

        let director = Director::load(store, "https://src.example", TextPreparer::default())
            .await
            .unwrap();
        director.persist().await.unwrap();
    }
}
