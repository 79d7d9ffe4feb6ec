//! Business logic services.
//!
//! This module contains the aggregation core: the API client, per-PR
//! enrichment, the reviewer state reconciler, the conversation threading
//! engine, the unread engine, and the background refresh loop.
//!
//! Reconciliation and threading are pure functions of their inputs and can
//! be used directly on already-fetched collections.

pub mod enrichment;
pub mod github_client;
pub mod notifications;
pub mod reconciler;
pub mod refresh;
pub mod threading;

pub use github_client::{GitHubClient, GitHubClientConfig};
pub use refresh::{RefreshConfig, RefreshEngine, RefreshHandle};
