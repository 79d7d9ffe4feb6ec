//! Reviewer reconciliation and threading scenarios.
//!
//! These tests exercise the aggregation rules end-to-end on realistic
//! per-PR collections:
//! - reconciling identical inputs twice yields identical states
//! - a later comment never downgrades an approval
//! - a fresh review request supersedes a prior approval
//! - inline comments group strictly by file location
//! - the documented end-to-end scenario with viewer-first ordering

use pr_pulse::models::{
    CommentKind, CommentRecord, RequestedReviewers, ReviewEvent, ReviewVerdict, ReviewerStatus,
    ThreadKind, TimelineItem,
};
use pr_pulse::services::{reconciler, threading};

fn review(reviewer: &str, verdict: ReviewVerdict, at: i64) -> ReviewEvent {
    ReviewEvent {
        reviewer_id: reviewer.to_string(),
        submitted_at: at,
        verdict,
        body: None,
    }
}

fn general_comment(id: i64, author: &str, at: i64, body: &str) -> CommentRecord {
    CommentRecord {
        id,
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

fn inline_comment(id: i64, author: &str, path: &str, line: i64, at: i64) -> CommentRecord {
    CommentRecord {
        id,
        author_id: author.to_string(),
        created_at: at,
        updated_at: at,
        body: format!("note on {}:{}", path, line),
        kind: CommentKind::Inline,
        file_path: Some(path.to_string()),
        line: Some(line),
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
fn reconciling_identical_inputs_twice_is_identical() {
    let reviews = vec![
        review("bob", ReviewVerdict::Approved, 100),
        review("alice", ReviewVerdict::ChangesRequested, 150),
        review("bob", ReviewVerdict::Commented, 200),
    ];
    let req = requested(&["carol"], &["dave"]);
    let comments = vec![general_comment(1, "erin", 300, "drive-by")];

    let first = reconciler::reconcile_reviewers(&reviews, &req, &comments, Some("alice"));
    let second = reconciler::reconcile_reviewers(&reviews, &req, &comments, Some("alice"));

    assert_eq!(first, second);
}

#[test]
fn approval_survives_later_comment_when_not_re_requested() {
    let reviews = vec![
        review("bob", ReviewVerdict::Approved, 100),
        review("bob", ReviewVerdict::Commented, 200),
    ];

    let states =
        reconciler::reconcile_reviewers(&reviews, &RequestedReviewers::default(), &[], None);

    assert_eq!(states.len(), 1);
    assert_eq!(states[0].status, ReviewerStatus::Approved);
}

#[test]
fn re_request_supersedes_approval() {
    // Same events as above, but bob is back on the requested list: the PR
    // author asked for re-review, which overrides the stale approval.
    let reviews = vec![
        review("bob", ReviewVerdict::Approved, 100),
        review("bob", ReviewVerdict::Commented, 200),
    ];
    let req = requested(&["bob"], &[]);

    let states = reconciler::reconcile_reviewers(&reviews, &req, &[], None);

    assert_eq!(states[0].status, ReviewerStatus::ReviewRequested);
}

#[test]
fn re_request_keeps_comment_history() {
    // Status resets on re-request; comment history intentionally does not.
    let mut reviews = vec![review("bob", ReviewVerdict::Approved, 100)];
    reviews[0].body = Some("nice cleanup".to_string());
    let req = requested(&[], &["bob"]);

    let states = reconciler::reconcile_reviewers(&reviews, &req, &[], None);

    assert_eq!(states[0].status, ReviewerStatus::ReviewRequested);
    assert!(states[0].has_comments);
}

#[test]
fn inline_comments_group_by_location() {
    let comments = vec![
        inline_comment(1, "alice", "a.py", 10, 100),
        inline_comment(2, "bob", "a.py", 10, 200),
        inline_comment(3, "carol", "b.py", 5, 150),
    ];

    let threads = threading::build_threads(&comments, &[]);

    let review_threads: Vec<_> = threads
        .iter()
        .filter(|t| t.kind == ThreadKind::ReviewThread)
        .collect();
    assert_eq!(review_threads.len(), 2);

    for thread in &review_threads {
        let anchor = thread.anchor.as_ref().unwrap();
        let mut last_seen = i64::MIN;
        for item in &thread.items {
            let TimelineItem::Comment(comment) = item else {
                panic!("review thread holds only comments");
            };
            // Own-path comments only, oldest-first.
            assert_eq!(comment.file_path.as_deref(), Some(anchor.file_path.as_str()));
            assert!(comment.created_at >= last_seen);
            last_seen = comment.created_at;
        }
    }

    let a_thread = review_threads
        .iter()
        .find(|t| t.anchor.as_ref().unwrap().file_path == "a.py")
        .unwrap();
    assert_eq!(a_thread.items.len(), 2);
}

#[test]
fn end_to_end_scenario_with_viewer_first_ordering() {
    let reviews = vec![review("bob", ReviewVerdict::Approved, 1)];
    let req = requested(&["carol"], &[]);
    let comments = vec![general_comment(1, "carol", 2, "lgtm")];

    let states = reconciler::reconcile_reviewers(&reviews, &req, &comments, Some("carol"));
    assert_eq!(states[0].reviewer_id, "carol");
    assert!(states[0].is_current_viewer);
    assert_eq!(states[0].status, ReviewerStatus::ReviewRequested);
    assert!(states[0].has_comments);
    assert_eq!(states[1].reviewer_id, "bob");
    assert_eq!(states[1].status, ReviewerStatus::Approved);
    assert!(!states[1].has_comments);

    // Same inputs, bob as viewer: bob first, remainder lexicographic.
    let states = reconciler::reconcile_reviewers(&reviews, &req, &comments, Some("bob"));
    assert_eq!(states[0].reviewer_id, "bob");
    assert!(states[0].is_current_viewer);
    assert_eq!(states[1].reviewer_id, "carol");
}

#[test]
fn requested_sources_are_interchangeable() {
    // Whether a login arrives via the embedded list or the dedicated
    // endpoint must not change the outcome.
    let from_primary = reconciler::reconcile_reviewers(
        &[],
        &requested(&["carol"], &[]),
        &[],
        None,
    );
    let from_secondary = reconciler::reconcile_reviewers(
        &[],
        &requested(&[], &["carol"]),
        &[],
        None,
    );

    assert_eq!(from_primary, from_secondary);
    assert_eq!(from_primary[0].status, ReviewerStatus::ReviewRequested);
}
