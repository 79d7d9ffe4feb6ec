//! Pull request model.

use crate::models::checks::{CheckSummary, MergeableState};
use crate::models::comment::CommentRecord;
use crate::models::review::ReviewerState;
use crate::models::thread::{ConversationThread, TimelineItem};
use serde::Serialize;

/// Base pull request descriptor.
///
/// These are the fields the dashboard can always render, even when
/// enrichment for the PR failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Repository in `owner/repo` form.
    pub repo: String,

    /// PR number within the repository.
    pub number: i64,

    /// PR title.
    pub title: String,

    /// Author's login.
    pub author_id: String,

    /// SHA of the head commit, used for the combined status lookup.
    pub head_sha: String,

    /// Mergeability of the branch against its base.
    pub mergeable_state: MergeableState,

    /// URL of the PR in the platform web UI.
    pub html_url: String,

    /// Creation timestamp (epoch ms).
    pub created_at: i64,

    /// Last update timestamp (epoch ms).
    pub updated_at: i64,
}

impl PullRequest {
    /// Ledger subject key: `owner/repo#number`.
    pub fn subject_key(&self) -> String {
        format!("{}#{}", self.repo, self.number)
    }
}

/// Full per-PR aggregation output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestDetail {
    pub pull_request: PullRequest,

    /// Canonical reviewer states, viewer first.
    pub reviewer_states: Vec<ReviewerState>,

    /// Reduced head-commit status.
    pub checks: CheckSummary,

    /// Whether the PR satisfies the merge-readiness rule.
    pub ready_to_merge: bool,

    /// Conversation threads, general thread first.
    pub threads: Vec<ConversationThread>,

    /// Timeline sorted newest-first.
    pub recency_order: Vec<TimelineItem>,

    /// Timeline in the grouped default presentation.
    pub default_order: Vec<TimelineItem>,

    /// Raw item count including bot-authored items, which the orderings
    /// exclude from display.
    pub total_item_count: usize,

    /// Full comment set (general and inline), as fetched. The unread engine
    /// counts against this.
    pub comments: Vec<CommentRecord>,

    /// Set when enrichment for this PR failed and only base fields are
    /// trustworthy. The dashboard shows a "reviewers unavailable" indicator
    /// instead of hiding the PR.
    pub reviewers_unavailable: bool,
}
