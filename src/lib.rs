//! pr-pulse - review-activity aggregation core for a local-first pull
//! request dashboard.
//!
//! The crate reconciles the independently-fetched, eventually-stale
//! collections a code-hosting platform exposes per pull request (review
//! submissions, requested-reviewer lists, comments, commit status) into:
//!
//! - one canonical [`models::ReviewerState`] per reviewer, driving status
//!   badges;
//! - [`models::ConversationThread`]s plus two flattened timeline orderings,
//!   driving the conversation view;
//! - per-reviewer unread counts and urgency, driven by the persisted
//!   notification ledger.

pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::AppError;
pub use models::{PullRequest, PullRequestDetail, ReviewerState, UnreadInfo};
pub use services::enrichment::{enrich_pull_request, enrich_pull_requests};
pub use services::github_client::{GitHubClient, GitHubClientConfig};
pub use services::notifications::{acknowledge, observe_subject, sweep_idle_entries, unread_info};
pub use services::reconciler::{ready_to_merge, reconcile_reviewers, summarize_checks};
pub use services::threading::{build_threads, order_by_recency, order_default};
