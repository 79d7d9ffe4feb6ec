//! Reviewer state reconciler.
//!
//! Folds the raw per-PR collections (review submissions, requested-reviewer
//! lists, general comments) into one canonical `ReviewerState` per person,
//! and reduces the combined commit status. All functions here are pure:
//! reconciliation is recomputed fully from its inputs on every fetch.

use crate::models::{
    CheckState, CheckSummary, CommentRecord, MergeableState, RequestedReviewers, ReviewEvent,
    ReviewerState, ReviewerStatus,
};
use crate::services::github_client::GitHubCombinedStatus;
use std::collections::BTreeMap;

/// Approvals required before a PR is considered ready to merge.
pub const READY_APPROVAL_COUNT: usize = 3;

/// Per-reviewer fold state. `status_at` is the submission time of the event
/// that set the current status, used for the chronological tie-break.
struct Slot {
    status: ReviewerStatus,
    status_at: i64,
    has_comments: bool,
    last_activity_at: i64,
}

impl Slot {
    fn requested() -> Self {
        Self {
            status: ReviewerStatus::ReviewRequested,
            status_at: 0,
            has_comments: false,
            last_activity_at: 0,
        }
    }
}

/// Whether the override table blocks `next` from replacing `current`.
///
/// An existing `approved` is never downgraded by a later non-approved event,
/// and `changes_requested` is never downgraded by `commented` or
/// `review_requested`. Only final normalization (a fresh review request) may
/// downgrade those two states.
fn verdict_blocked(current: ReviewerStatus, next: ReviewerStatus) -> bool {
    match current {
        ReviewerStatus::Approved => next != ReviewerStatus::Approved,
        ReviewerStatus::ChangesRequested => matches!(
            next,
            ReviewerStatus::Commented | ReviewerStatus::ReviewRequested
        ),
        _ => false,
    }
}

/// Produce the canonical reviewer states for one pull request.
///
/// The output is ordered viewer-first, remainder lexicographic by login.
/// Reconciling identical inputs twice yields identical output.
pub fn reconcile_reviewers(
    reviews: &[ReviewEvent],
    requested: &RequestedReviewers,
    general_comments: &[CommentRecord],
    viewer: Option<&str>,
) -> Vec<ReviewerState> {
    let mut slots: BTreeMap<String, Slot> = BTreeMap::new();

    // Step 1: seed from both requested-reviewer sources. A seed never
    // downgrades a completed review (the lists can lag one).
    for reviewer_id in requested.union() {
        let slot = slots
            .entry(reviewer_id.to_string())
            .or_insert_with(Slot::requested);
        if !matches!(
            slot.status,
            ReviewerStatus::Approved | ReviewerStatus::ChangesRequested
        ) {
            slot.status = ReviewerStatus::ReviewRequested;
        }
    }

    // Step 2: fold review submissions. The sequence preserves API order but
    // is not assumed sorted, so the later `submitted_at` wins.
    for event in reviews {
        let next = ReviewerStatus::from_verdict(event.verdict);
        let slot = slots
            .entry(event.reviewer_id.clone())
            .or_insert_with(|| Slot {
                status: next,
                status_at: event.submitted_at,
                has_comments: false,
                last_activity_at: 0,
            });

        if !verdict_blocked(slot.status, next) && event.submitted_at >= slot.status_at {
            slot.status = next;
            slot.status_at = event.submitted_at;
        }
        if event.has_body() {
            slot.has_comments = true;
        }
        slot.last_activity_at = slot.last_activity_at.max(event.submitted_at);
    }

    // Step 3: fold general comments. Unseen commenters enter as `commented`;
    // seen ones only gain comment history.
    for comment in general_comments {
        let slot = slots
            .entry(comment.author_id.clone())
            .or_insert_with(|| Slot {
                status: ReviewerStatus::Commented,
                status_at: comment.created_at,
                has_comments: false,
                last_activity_at: 0,
            });
        slot.has_comments = true;
        slot.last_activity_at = slot.last_activity_at.max(comment.last_touched_at());
    }

    // Step 4: final normalization. A reviewer currently listed as requested
    // is awaiting re-review, which supersedes any prior verdict. Comment
    // history and activity timestamps survive the reset.
    for reviewer_id in requested.union() {
        if let Some(slot) = slots.get_mut(reviewer_id) {
            slot.status = ReviewerStatus::ReviewRequested;
        }
    }

    // Step 5: flag the viewer, emit viewer-first then lexicographic.
    let mut states: Vec<ReviewerState> = slots
        .into_iter()
        .map(|(reviewer_id, slot)| {
            let is_current_viewer = viewer == Some(reviewer_id.as_str());
            ReviewerState {
                reviewer_id,
                status: slot.status,
                has_comments: slot.has_comments,
                last_activity_at: slot.last_activity_at,
                is_current_viewer,
            }
        })
        .collect();

    if let Some(pos) = states.iter().position(|s| s.is_current_viewer) {
        let viewer_state = states.remove(pos);
        states.insert(0, viewer_state);
    }

    states
}

/// Reduce a combined commit status payload.
///
/// A missing payload (endpoint unavailable) degrades to `unknown`.
pub fn summarize_checks(combined: Option<&GitHubCombinedStatus>) -> CheckSummary {
    let Some(combined) = combined else {
        return CheckSummary::unknown();
    };

    let mut succeeded = 0;
    let mut failing_names = Vec::new();
    for status in &combined.statuses {
        match CheckState::from(status.state.as_str()) {
            CheckState::Success => succeeded += 1,
            CheckState::Failure | CheckState::Error => failing_names.push(status.context.clone()),
            _ => {}
        }
    }

    CheckSummary {
        overall_state: CheckState::from(combined.state.as_str()),
        total_count: combined.total_count,
        succeeded_count: succeeded,
        failing_names,
    }
}

/// Merge-readiness rule: enough approvals, green checks, and a branch that
/// does not need a rebase first.
pub fn ready_to_merge(
    states: &[ReviewerState],
    checks: &CheckSummary,
    mergeable_state: MergeableState,
) -> bool {
    let approvals = states
        .iter()
        .filter(|s| s.status == ReviewerStatus::Approved)
        .count();

    approvals >= READY_APPROVAL_COUNT
        && checks.overall_state == CheckState::Success
        && !mergeable_state.needs_rebase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommentKind, ReviewVerdict};
    use crate::services::github_client::GitHubCommitStatus;

    fn review(reviewer: &str, verdict: ReviewVerdict, at: i64) -> ReviewEvent {
        ReviewEvent {
            reviewer_id: reviewer.to_string(),
            submitted_at: at,
            verdict,
            body: None,
        }
    }

    fn general_comment(author: &str, at: i64, body: &str) -> CommentRecord {
        CommentRecord {
            id: at,
            author_id: author.to_string(),
            created_at: at,
            updated_at: at,
            body: body.to_string(),
            kind: CommentKind::General,
            file_path: None,
            line: None,
            original_line: None,
            side: None,
            in_reply_to_id: None,
        }
    }

    fn requested(primary: &[&str], secondary: &[&str]) -> RequestedReviewers {
        RequestedReviewers {
            primary: primary.iter().map(|s| s.to_string()).collect(),
            secondary: secondary.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let reviews = vec![
            review("bob", ReviewVerdict::Approved, 10),
            review("alice", ReviewVerdict::ChangesRequested, 20),
        ];
        let req = requested(&["carol"], &[]);
        let comments = vec![general_comment("dave", 30, "thoughts?")];

        let first = reconcile_reviewers(&reviews, &req, &comments, Some("alice"));
        let second = reconcile_reviewers(&reviews, &req, &comments, Some("alice"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_approved_not_downgraded_by_later_comment() {
        let reviews = vec![
            review("bob", ReviewVerdict::Approved, 10),
            review("bob", ReviewVerdict::Commented, 20),
        ];
        let states = reconcile_reviewers(&reviews, &RequestedReviewers::default(), &[], None);

        assert_eq!(states.len(), 1);
        assert_eq!(states[0].status, ReviewerStatus::Approved);
        assert_eq!(states[0].last_activity_at, 20);
    }

    #[test]
    fn test_re_request_overrides_approval_but_keeps_history() {
        let reviews = vec![ReviewEvent {
            reviewer_id: "bob".to_string(),
            submitted_at: 10,
            verdict: ReviewVerdict::Approved,
            body: Some("ship it".to_string()),
        }];

        let req = requested(&["bob"], &[]);
        let states = reconcile_reviewers(&reviews, &req, &[], None);

        // Status resets to review_requested; comment history does not reset.
        assert_eq!(states[0].status, ReviewerStatus::ReviewRequested);
        assert!(states[0].has_comments);
        assert_eq!(states[0].last_activity_at, 10);
    }

    #[test]
    fn test_changes_requested_not_downgraded_by_comment() {
        let reviews = vec![
            review("alice", ReviewVerdict::ChangesRequested, 10),
            review("alice", ReviewVerdict::Commented, 20),
            review("alice", ReviewVerdict::Pending, 30),
        ];
        let states = reconcile_reviewers(&reviews, &RequestedReviewers::default(), &[], None);
        assert_eq!(states[0].status, ReviewerStatus::ChangesRequested);
    }

    #[test]
    fn test_later_approval_replaces_changes_requested() {
        let reviews = vec![
            review("alice", ReviewVerdict::ChangesRequested, 10),
            review("alice", ReviewVerdict::Approved, 20),
        ];
        let states = reconcile_reviewers(&reviews, &RequestedReviewers::default(), &[], None);
        assert_eq!(states[0].status, ReviewerStatus::Approved);
    }

    #[test]
    fn test_out_of_order_events_use_timestamps() {
        // Later event first in the sequence; the fold must still let the
        // chronologically later one win.
        let reviews = vec![
            review("alice", ReviewVerdict::ChangesRequested, 50),
            review("alice", ReviewVerdict::Dismissed, 10),
        ];
        let states = reconcile_reviewers(&reviews, &RequestedReviewers::default(), &[], None);
        assert_eq!(states[0].status, ReviewerStatus::ChangesRequested);
    }

    #[test]
    fn test_unseen_commenter_enters_as_commented() {
        let comments = vec![general_comment("dave", 30, "drive-by note")];
        let states = reconcile_reviewers(&[], &RequestedReviewers::default(), &comments, None);

        assert_eq!(states[0].reviewer_id, "dave");
        assert_eq!(states[0].status, ReviewerStatus::Commented);
        assert!(states[0].has_comments);
    }

    #[test]
    fn test_end_to_end_ordering_and_states() {
        let reviews = vec![review("bob", ReviewVerdict::Approved, 1)];
        let req = requested(&["carol"], &[]);
        let comments = vec![general_comment("carol", 2, "lgtm")];

        let states = reconcile_reviewers(&reviews, &req, &comments, Some("bob"));

        // Viewer (bob) first, then carol.
        assert_eq!(states[0].reviewer_id, "bob");
        assert!(states[0].is_current_viewer);
        assert_eq!(states[0].status, ReviewerStatus::Approved);
        assert!(!states[0].has_comments);

        assert_eq!(states[1].reviewer_id, "carol");
        assert_eq!(states[1].status, ReviewerStatus::ReviewRequested);
        assert!(states[1].has_comments);
    }

    #[test]
    fn test_remainder_sorted_lexicographically() {
        let reviews = vec![
            review("zoe", ReviewVerdict::Approved, 1),
            review("amy", ReviewVerdict::Commented, 2),
            review("mia", ReviewVerdict::Approved, 3),
        ];
        let states = reconcile_reviewers(&reviews, &RequestedReviewers::default(), &[], Some("mia"));

        let order: Vec<&str> = states.iter().map(|s| s.reviewer_id.as_str()).collect();
        assert_eq!(order, vec!["mia", "amy", "zoe"]);
    }

    #[test]
    fn test_summarize_checks() {
        let combined = GitHubCombinedStatus {
            state: "failure".to_string(),
            total_count: 3,
            statuses: vec![
                GitHubCommitStatus {
                    state: "success".to_string(),
                    context: "ci/build".to_string(),
                },
                GitHubCommitStatus {
                    state: "failure".to_string(),
                    context: "ci/test".to_string(),
                },
                GitHubCommitStatus {
                    state: "error".to_string(),
                    context: "ci/lint".to_string(),
                },
            ],
        };

        let summary = summarize_checks(Some(&combined));
        assert_eq!(summary.overall_state, CheckState::Failure);
        assert_eq!(summary.succeeded_count, 1);
        assert_eq!(summary.failing_names, vec!["ci/test", "ci/lint"]);

        let missing = summarize_checks(None);
        assert_eq!(missing.overall_state, CheckState::Unknown);
    }

    #[test]
    fn test_ready_to_merge_rule() {
        let approved = |id: &str| ReviewerState {
            reviewer_id: id.to_string(),
            status: ReviewerStatus::Approved,
            has_comments: false,
            last_activity_at: 0,
            is_current_viewer: false,
        };
        let states = vec![approved("a"), approved("b"), approved("c")];
        let green = CheckSummary {
            overall_state: CheckState::Success,
            total_count: 1,
            succeeded_count: 1,
            failing_names: vec![],
        };

        assert!(ready_to_merge(&states, &green, MergeableState::Clean));
        assert!(!ready_to_merge(&states, &green, MergeableState::Behind));
        assert!(!ready_to_merge(&states[..2].to_vec(), &green, MergeableState::Clean));
        assert!(!ready_to_merge(
            &states,
            &CheckSummary::unknown(),
            MergeableState::Clean
        ));
    }
}
