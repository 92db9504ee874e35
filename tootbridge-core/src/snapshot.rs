//! Bridge snapshot persistence.
//!
//! The snapshot is the only state the relay keeps: one record per bridge holding
//! its accounts, credential and watermark. It is a pretty-printed JSON array so
//! operators can edit it by hand between runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot file {0:?} does not exist")]
    Missing(PathBuf),
    #[error("snapshot contains no bridges")]
    Empty,
    #[error("failed to read or write snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Persisted form of one bridge. Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRecord {
    #[serde(rename = "TWITTER_USERNAME")]
    pub source_account: String,
    #[serde(rename = "HOST_INSTANCE")]
    pub destination_endpoint: String,
    #[serde(rename = "LAST_POSTED_ID", deserialize_with = "watermark_from_int_or_str")]
    pub watermark: u64,
    #[serde(rename = "APP_SECURE_TOKEN")]
    pub destination_credential: String,
}

/// Hand-edited snapshots sometimes quote the id; accept both forms.
fn watermark_from_int_or_str<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrStr {
        Int(u64),
        Str(String),
    }

    match IntOrStr::deserialize(deserializer)? {
        IntOrStr::Int(v) => Ok(v),
        IntOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Storage for the bridge snapshot.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load all records. An absent or empty snapshot is an error.
    async fn load(&self) -> Result<Vec<BridgeRecord>, SnapshotError>;

    /// Replace the stored snapshot with `records`.
    async fn save(&self, records: &[BridgeRecord]) -> Result<(), SnapshotError>;
}

/// Encode records the way they are written to disk: 4-space indented JSON.
pub fn encode_records(records: &[BridgeRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser)?;
    Ok(buf)
}

/// Snapshot kept in a JSON file on the local filesystem.
pub struct JsonFileSnapshot {
    path: PathBuf,
}

impl JsonFileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshot {
    async fn load(&self) -> Result<Vec<BridgeRecord>, SnapshotError> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::Missing(self.path.clone()))
            }
            Err(e) => return Err(SnapshotError::Io(e)),
        };
        if content.iter().all(u8::is_ascii_whitespace) {
            return Err(SnapshotError::Empty);
        }

        let records: Vec<BridgeRecord> = serde_json::from_slice(&content)?;
        if records.is_empty() {
            return Err(SnapshotError::Empty);
        }
        info!(path = ?self.path, bridges = records.len(), "Loaded snapshot");
        Ok(records)
    }

    async fn save(&self, records: &[BridgeRecord]) -> Result<(), SnapshotError> {
        let encoded = encode_records(records)?;

        // Write atomically via temp file
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &encoded).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!(path = ?self.path, bridges = records.len(), "Saved snapshot");
        Ok(())
    }
}
