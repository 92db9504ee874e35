//! One source-account → destination-account pairing and its relay protocol.
//!
//! A call to [`Bridge::synchronize`] runs two phases back to back:
//!   - **gather**: fetch the source timeline and queue every item newer than the
//!     watermark, oldest first;
//!   - **relay**: post queued items in order, moving the watermark to each item
//!     the destination accepts.
//!
//! Failures never escape a bridge. A failed fetch gathers nothing; a failed post
//! drops that one item and relay continues with the next. The watermark can
//! therefore move past an item whose post failed, and that item is not retried.

use std::collections::VecDeque;

use tracing::{error, info, warn};

use crate::contract::{LinkResolver, PostOutcome, SourceFeed, StatusPoster, StatusRequest};
use crate::item::Item;
use crate::snapshot::BridgeRecord;
use crate::text::TextPreparer;

/// Summary of one bridge's pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeReport {
    pub account: String,
    pub gathered: usize,
    pub posted: usize,
    pub failed: usize,
    pub watermark: u64,
}

#[derive(Debug)]
pub struct Bridge {
    destination_endpoint: String,
    destination_credential: String,
    source_account: String,
    watermark: u64,
    source_endpoint: String,
    pending: VecDeque<Item>,
}

impl Bridge {
    pub fn new(
        destination_endpoint: impl Into<String>,
        destination_credential: impl Into<String>,
        source_account: impl Into<String>,
        watermark: u64,
        source_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            destination_endpoint: destination_endpoint.into(),
            destination_credential: destination_credential.into(),
            source_account: source_account.into(),
            watermark,
            source_endpoint: source_endpoint.into(),
            pending: VecDeque::new(),
        }
    }

    pub fn from_record(record: BridgeRecord, source_endpoint: &str) -> Self {
        Self::new(
            record.destination_endpoint,
            record.destination_credential,
            record.source_account,
            record.watermark,
            source_endpoint,
        )
    }

    pub fn to_record(&self) -> BridgeRecord {
        BridgeRecord {
            source_account: self.source_account.clone(),
            destination_endpoint: self.destination_endpoint.clone(),
            watermark: self.watermark,
            destination_credential: self.destination_credential.clone(),
        }
    }

    pub fn source_account(&self) -> &str {
        &self.source_account
    }

    pub fn destination_endpoint(&self) -> &str {
        &self.destination_endpoint
    }

    /// Id of the last item relayed, or the persisted baseline.
    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Gather then relay.
    pub async fn synchronize<C>(&mut self, client: &C, preparer: &TextPreparer) -> BridgeReport
    where
        C: SourceFeed + StatusPoster + LinkResolver,
    {
        let gathered = self.gather(client).await;
        let (posted, failed) = self.relay(client, preparer).await;
        BridgeReport {
            account: self.source_account.clone(),
            gathered,
            posted,
            failed,
            watermark: self.watermark,
        }
    }

    /// Queue all items above the watermark, oldest first. Returns how many were queued.
    pub async fn gather<F>(&mut self, feed: &F) -> usize
    where
        F: SourceFeed + ?Sized,
    {
        let raw_items = match feed
            .fetch_timeline(&self.source_endpoint, &self.source_account)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                error!(
                    account = %self.source_account,
                    error = %e,
                    "Error retrieving new items"
                );
                return 0;
            }
        };

        let mut queued = 0;
        // Highest id already accepted; a repeated id in the batch is not queued twice.
        let mut floor = self
            .pending
            .back()
            .map_or(self.watermark, |last| last.id().max(self.watermark));
        // The feed is newest-first.
        for raw in raw_items.into_iter().rev() {
            let item = match Item::try_from(raw) {
                Ok(item) => item,
                Err(e) => {
                    warn!(account = %self.source_account, error = %e, "Skipping malformed item");
                    continue;
                }
            };
            if item.id() <= floor {
                continue;
            }
            floor = item.id();
            self.pending.push_back(item);
            queued += 1;
        }

        info!(
            account = %self.source_account,
            gathered = queued,
            "Gathered new items"
        );
        queued
    }

    /// Post every queued item in order. Returns `(posted, failed)`.
    pub async fn relay<C>(&mut self, client: &C, preparer: &TextPreparer) -> (usize, usize)
    where
        C: StatusPoster + LinkResolver + ?Sized,
    {
        let mut posted = 0;
        let mut failed = 0;

        while let Some(item) = self.pending.pop_front() {
            let text = preparer.prepare(&item, client).await;
            let outcome = client
                .post_status(StatusRequest {
                    endpoint: &self.destination_endpoint,
                    credential: &self.destination_credential,
                    text: &text,
                })
                .await;

            match outcome {
                PostOutcome::Posted { status_id } => {
                    info!(
                        account = %self.source_account,
                        item_id = item.id(),
                        status_id = %status_id,
                        "Item posted to destination"
                    );
                    self.advance_watermark(item.id());
                    posted += 1;
                }
                PostOutcome::Failed { reason } => {
                    error!(
                        account = %self.source_account,
                        item_id = item.id(),
                        reason = %reason,
                        "Error posting status, dropping item"
                    );
                    failed += 1;
                }
            }
        }

        (posted, failed)
    }

    // Items are relayed in ascending order, so this only ever moves forward.
    fn advance_watermark(&mut self, id: u64) {
        self.watermark = self.watermark.max(id);
    }
}
