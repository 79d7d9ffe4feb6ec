//! Data models for the aggregation engine.
//!
//! These models represent the domain entities produced by the reconciler,
//! threading engine, and unread engine, plus the notification ledger row
//! persisted in the local SQLite database.
//!
//! Derived output models implement Serialize for consumption by the
//! rendering layer; the ledger row also derives FromRow for SQLx queries.

pub mod checks;
pub mod comment;
pub mod notification;
pub mod pull_request;
pub mod review;
pub mod thread;

// Re-exports for convenient access
pub use checks::{CheckState, CheckSummary, MergeableState};
pub use comment::{CommentKind, CommentRecord, ThreadAnchor, DEFAULT_SIDE};
pub use notification::{LedgerEntry, UnreadInfo, Urgency};
pub use pull_request::{PullRequest, PullRequestDetail};
pub use review::{
    RequestedReviewers, ReviewEvent, ReviewVerdict, ReviewerState, ReviewerStatus,
};
pub use thread::{ConversationThread, ThreadKind, TimelineItem, MAIN_CONVERSATION_ID};
