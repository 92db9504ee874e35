//! reqwest-backed implementation of the collaborator contracts.
//!
//! One [`HttpClient`] is built per pass and shared by every bridge in it.
//! `reqwest::Client` pools connections internally and is safe to use from many
//! concurrent flows, so the shared reference needs no locking.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, LOCATION};
use reqwest::{redirect, Client};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::contract::{
    FeedError, LinkResolver, PostOutcome, ResolveError, SourceFeed, StatusPoster, StatusRequest,
};
use crate::item::RawItem;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ClientError(#[from] reqwest::Error);

/// Response of `POST /api/v1/statuses`; only the id is of interest.
#[derive(Debug, Deserialize)]
struct CreatedStatus {
    id: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    resolve_timeout: Duration,
}

impl HttpClient {
    /// Build a client. Redirects are never followed: link resolution reads the
    /// `Location` header of the first response.
    ///
    /// `request_timeout` bounds every timeline fetch and status post, connect
    /// included. Link resolution uses `resolve_timeout` instead.
    pub fn new(request_timeout: Duration, resolve_timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(request_timeout)
            .timeout(request_timeout)
            .user_agent(concat!("tootbridge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            resolve_timeout,
        })
    }
}

#[async_trait]
impl SourceFeed for HttpClient {
    async fn fetch_timeline(
        &self,
        source_endpoint: &str,
        account: &str,
    ) -> Result<Vec<RawItem>, FeedError> {
        let url = format!("{}/{}", source_endpoint.trim_end_matches('/'), account);
        debug!(url = %url, "Fetching source timeline");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            return Err(FeedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Vec<RawItem>>()
            .await
            .map_err(|e| FeedError::Decode(e.to_string()))
    }
}

#[async_trait]
impl StatusPoster for HttpClient {
    async fn post_status<'a>(&self, request: StatusRequest<'a>) -> PostOutcome {
        let url = format!(
            "{}/api/v1/statuses",
            request.endpoint.trim_end_matches('/')
        );

        let resp = match self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", request.credential))
            .form(&[("status", request.text), ("visibility", "unlisted")])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                return PostOutcome::Failed {
                    reason: format!("request to {url} failed: {e}"),
                }
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            return PostOutcome::Failed {
                reason: format!("server returned code {} - {}", status.as_u16(), body),
            };
        }

        match resp.json::<CreatedStatus>().await {
            Ok(created) => PostOutcome::Posted {
                status_id: stringify_id(&created.id),
            },
            Err(e) => {
                // Accepted by the server, so the post exists; only its id is unknown.
                error!(url = %url, error = %e, "Could not decode created status");
                PostOutcome::Posted {
                    status_id: String::from("<unknown>"),
                }
            }
        }
    }
}

#[async_trait]
impl LinkResolver for HttpClient {
    async fn resolve(&self, link: &str) -> Result<String, ResolveError> {
        let resp = self
            .http
            .head(link)
            .timeout(self.resolve_timeout)
            .send()
            .await
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ResolveError::Status(status.as_u16()));
        }

        resp.headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|target| !target.is_empty())
            .map(str::to_string)
            .ok_or(ResolveError::MissingLocation)
    }
}

fn stringify_id(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
