#![doc = "tootbridge-core: relay logic for tootbridge."]

//! Relays new posts from source (Twitter) accounts to destination (Mastodon)
//! accounts, remembering per bridge the id of the last relayed post so each post
//! goes out at most once.
//!
//! # Usage
//! Load a [`director::Director`] from a [`snapshot::SnapshotStore`], then call
//! [`director::Director::synchronize`] once per poll with an
//! [`client::HttpClient`].

pub mod bridge;
pub mod client;
pub mod config;
pub mod contract;
pub mod director;
pub mod item;
pub mod snapshot;
pub mod text;
