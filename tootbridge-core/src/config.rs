use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::client::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_RESOLVE_TIMEOUT};
use crate::text::TextConfig;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";

/// Everything the relay needs to run, resolved from the environment by the CLI.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base URL of the source API; timelines live at `{source_endpoint}/{account}`.
    pub source_endpoint: String,
    pub poll_interval: Duration,
    pub credentials_path: PathBuf,
    /// Upper bound on each timeline fetch and status post.
    pub request_timeout: Duration,
    pub resolve_timeout: Duration,
    pub text: TextConfig,
}

impl RelayConfig {
    pub fn new(source_endpoint: impl Into<String>) -> Self {
        Self {
            source_endpoint: source_endpoint.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            text: TextConfig::default(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            source_endpoint = %self.source_endpoint,
            credentials_path = %self.credentials_path.display(),
            poll_interval_secs = self.poll_interval.as_secs_f64(),
            request_timeout_secs = self.request_timeout.as_secs_f64(),
            "Loaded RelayConfig"
        );
        debug!(text = ?self.text, "Text preparation config");
    }
}
