//! # contract: collaborator interfaces for the relay pipeline
//!
//! A bridge talks to three outside parties during a pass: the source feed it reads
//! posts from, the destination instance it posts statuses to, and the link
//! shorteners whose redirects it follows while preparing text. Each one is a trait
//! here so the pipeline can run against the real HTTP client
//! ([`crate::client::HttpClient`]) or against `mockall` mocks in tests.
//!
//! ## Error Handling
//! - Feed and resolution failures are typed errors; callers log them and carry on.
//! - Post attempts never fail with an error. They return a [`PostOutcome`],
//!   because a rejected post is an expected outcome the bridge handles item by item.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall` (`MockSourceFeed`, `MockStatusPoster`,
//!   `MockLinkResolver`), exported with the `test-export-mocks` feature.

use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::item::RawItem;

/// Error type for [`SourceFeed`].
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("source returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("source request failed: {0}")]
    Transport(String),
    #[error("source payload could not be decoded: {0}")]
    Decode(String),
}

/// Error type for [`LinkResolver`].
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("server returned an error: '{0}'")]
    Status(u16),
    #[error("server returned an empty link")]
    MissingLocation,
    #[error("request failed: {0}")]
    Transport(String),
}

/// Everything needed to create one status on the destination instance.
#[derive(Debug, Clone, Copy)]
pub struct StatusRequest<'a> {
    /// Base URL of the destination instance, e.g. `https://mastodon.social`.
    pub endpoint: &'a str,
    /// Application token sent as a bearer credential.
    pub credential: &'a str,
    pub text: &'a str,
}

/// Result of a single post attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// The destination accepted the status and assigned it `status_id`.
    Posted { status_id: String },
    /// Transport failure or error status; the item is not retried.
    Failed { reason: String },
}

impl PostOutcome {
    pub fn is_posted(&self) -> bool {
        matches!(self, PostOutcome::Posted { .. })
    }
}

/// Reads the latest posts of a source account, newest first.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SourceFeed: Send + Sync {
    async fn fetch_timeline(
        &self,
        source_endpoint: &str,
        account: &str,
    ) -> Result<Vec<RawItem>, FeedError>;
}

/// Creates statuses on a destination instance.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StatusPoster: Send + Sync {
    async fn post_status<'a>(&self, request: StatusRequest<'a>) -> PostOutcome;
}

/// Expands a shortlink to its redirect target.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, link: &str) -> Result<String, ResolveError>;
}
