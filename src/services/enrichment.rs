//! Per-PR enrichment: concurrent raw fetches joined into one aggregate.
//!
//! For each pull request, the five optional collections are fetched
//! concurrently and joined before reconciliation. Optional-collection
//! failures degrade to empty defaults; only the mandatory PR descriptor is
//! fatal, and then only for that one PR. Across a listing, enrichment is
//! fan-out/fan-in with no shared mutable state between PRs.

use crate::error::AppError;
use crate::models::{
    CommentKind, CommentRecord, PullRequest, PullRequestDetail, RequestedReviewers, ReviewEvent,
    ReviewVerdict,
};
use crate::services::github_client::{
    GitHubClient, GitHubCombinedStatus, GitHubIssueComment, GitHubPullRequest, GitHubReview,
    GitHubReviewComment, GitHubRequestedReviewers,
};
use crate::services::{reconciler, threading};
use futures::stream::{self, StreamExt};

/// Parse an RFC 3339 wire timestamp to epoch milliseconds.
///
/// Malformed timestamps map to 0 with a warning rather than failing the
/// record.
pub fn parse_timestamp_ms(s: &str) -> i64 {
    match chrono::DateTime::parse_from_rfc3339(s) {
        Ok(dt) => dt.timestamp_millis(),
        Err(_) => {
            log::warn!("malformed timestamp {:?}, treating as epoch", s);
            0
        }
    }
}

/// Translate a wire verdict string, logging and defaulting on unknowns.
fn verdict_from_wire(state: &str) -> ReviewVerdict {
    ReviewVerdict::parse(state).unwrap_or_else(|| {
        log::warn!("unrecognized review verdict {:?}, treating as COMMENTED", state);
        ReviewVerdict::Commented
    })
}

/// Normalize review submissions. Submissions without an attributable user
/// (deleted accounts) are dropped.
pub fn review_events_from_wire(reviews: &[GitHubReview]) -> Vec<ReviewEvent> {
    reviews
        .iter()
        .filter_map(|r| {
            let user = match &r.user {
                Some(user) => user,
                None => {
                    log::debug!("review {} has no attributable user, skipping", r.id);
                    return None;
                }
            };
            Some(ReviewEvent {
                reviewer_id: user.login.clone(),
                submitted_at: r
                    .submitted_at
                    .as_deref()
                    .map(parse_timestamp_ms)
                    .unwrap_or(0),
                verdict: verdict_from_wire(&r.state),
                body: r.body.clone(),
            })
        })
        .collect()
}

/// Normalize inline review comments.
pub fn inline_comments_from_wire(comments: &[GitHubReviewComment]) -> Vec<CommentRecord> {
    comments
        .iter()
        .map(|c| {
            let created_at = parse_timestamp_ms(&c.created_at);
            CommentRecord {
                id: c.id,
                author_id: c.user.login.clone(),
                created_at,
                updated_at: c
                    .updated_at
                    .as_deref()
                    .map(parse_timestamp_ms)
                    .unwrap_or(created_at),
                body: c.body.clone(),
                kind: CommentKind::Inline,
                file_path: Some(c.path.clone()),
                line: c.line,
                original_line: c.original_line,
                side: c.side.clone(),
                in_reply_to_id: c.in_reply_to_id,
            }
        })
        .collect()
}

/// Normalize general discussion comments.
pub fn general_comments_from_wire(comments: &[GitHubIssueComment]) -> Vec<CommentRecord> {
    comments
        .iter()
        .map(|c| {
            let created_at = parse_timestamp_ms(&c.created_at);
            CommentRecord {
                id: c.id,
                author_id: c.user.login.clone(),
                created_at,
                updated_at: c
                    .updated_at
                    .as_deref()
                    .map(parse_timestamp_ms)
                    .unwrap_or(created_at),
                body: c.body.clone().unwrap_or_default(),
                kind: CommentKind::General,
                file_path: None,
                line: None,
                original_line: None,
                side: None,
                in_reply_to_id: None,
            }
        })
        .collect()
}

/// Build the base descriptor from a wire pull request.
pub fn pull_request_from_wire(repo: &str, pr: &GitHubPullRequest) -> PullRequest {
    PullRequest {
        repo: repo.to_string(),
        number: pr.number,
        title: pr.title.clone(),
        author_id: pr.user.login.clone(),
        head_sha: pr.head.sha.clone(),
        mergeable_state: pr
            .mergeable_state
            .as_deref()
            .map(Into::into)
            .unwrap_or(crate::models::MergeableState::Unknown),
        html_url: pr.html_url.clone(),
        created_at: parse_timestamp_ms(&pr.created_at),
        updated_at: parse_timestamp_ms(&pr.updated_at),
    }
}

/// Merge the two requested-reviewer sources. The descriptor embeds the
/// primary list; the dedicated endpoint yields the secondary one (users and
/// team slugs).
fn requested_from_wire(
    descriptor: &GitHubPullRequest,
    endpoint: &GitHubRequestedReviewers,
) -> RequestedReviewers {
    RequestedReviewers {
        primary: descriptor
            .requested_reviewers
            .as_ref()
            .map(|users| users.iter().map(|u| u.login.clone()).collect())
            .unwrap_or_default(),
        secondary: endpoint
            .users
            .iter()
            .map(|u| u.login.clone())
            .chain(endpoint.teams.iter().map(|t| t.slug.clone()))
            .collect(),
    }
}

/// Assemble the full detail from normalized collections.
fn assemble_detail(
    base: PullRequest,
    reviews: Vec<ReviewEvent>,
    inline_comments: Vec<CommentRecord>,
    general_comments: Vec<CommentRecord>,
    requested: RequestedReviewers,
    status: Option<GitHubCombinedStatus>,
    viewer: Option<&str>,
) -> PullRequestDetail {
    let reviewer_states =
        reconciler::reconcile_reviewers(&reviews, &requested, &general_comments, viewer);
    let checks = reconciler::summarize_checks(status.as_ref());
    let ready_to_merge =
        reconciler::ready_to_merge(&reviewer_states, &checks, base.mergeable_state);

    let mut comments = general_comments;
    comments.extend(inline_comments);

    let threads = threading::build_threads(&comments, &reviews);
    let recency_order = threading::order_by_recency(&comments, &reviews);
    let default_order = threading::order_default(&comments, &reviews);
    let total_item_count = threading::timeline_items(&comments, &reviews).len();

    PullRequestDetail {
        pull_request: base,
        reviewer_states,
        checks,
        ready_to_merge,
        threads,
        recency_order,
        default_order,
        total_item_count,
        comments,
        reviewers_unavailable: false,
    }
}

/// Detail emitted when enrichment failed: base fields only, with the
/// explicit "reviewers unavailable" indicator instead of hiding the PR.
fn degraded_detail(base: PullRequest) -> PullRequestDetail {
    PullRequestDetail {
        pull_request: base,
        reviewer_states: Vec::new(),
        checks: crate::models::CheckSummary::unknown(),
        ready_to_merge: false,
        threads: Vec::new(),
        recency_order: Vec::new(),
        default_order: Vec::new(),
        total_item_count: 0,
        comments: Vec::new(),
        reviewers_unavailable: true,
    }
}

/// Enrich a single pull request.
///
/// Fails only when the PR descriptor itself cannot be fetched; every other
/// collection degrades to empty with a logged warning.
pub async fn enrich_pull_request(
    client: &GitHubClient,
    repo: &str,
    number: i64,
    viewer: Option<&str>,
) -> Result<PullRequestDetail, AppError> {
    let descriptor = client.get_pull_request(repo, number).await?;
    let base = pull_request_from_wire(repo, &descriptor);

    let (reviews, inline, general, requested_endpoint, status) = tokio::join!(
        client.list_reviews(repo, number),
        client.list_review_comments(repo, number),
        client.list_issue_comments(repo, number),
        client.get_requested_reviewers(repo, number),
        client.get_combined_status(repo, &descriptor.head.sha),
    );

    let reviews = reviews.unwrap_or_else(|e| {
        log::warn!("reviews unavailable for {}: {}", base.subject_key(), e);
        Vec::new()
    });
    let inline = inline.unwrap_or_else(|e| {
        log::warn!("inline comments unavailable for {}: {}", base.subject_key(), e);
        Vec::new()
    });
    let general = general.unwrap_or_else(|e| {
        log::warn!("comments unavailable for {}: {}", base.subject_key(), e);
        Vec::new()
    });
    let requested_endpoint = requested_endpoint.unwrap_or_else(|e| {
        log::warn!(
            "requested reviewers unavailable for {}: {}",
            base.subject_key(),
            e
        );
        GitHubRequestedReviewers::default()
    });
    let status = match status {
        Ok(status) => Some(status),
        Err(e) => {
            log::warn!("commit status unavailable for {}: {}", base.subject_key(), e);
            None
        }
    };

    let requested = requested_from_wire(&descriptor, &requested_endpoint);

    Ok(assemble_detail(
        base,
        review_events_from_wire(&reviews),
        inline_comments_from_wire(&inline),
        general_comments_from_wire(&general),
        requested,
        status,
        viewer,
    ))
}

/// Enrich a listing of pull requests with bounded concurrency.
///
/// A PR whose enrichment failed is still emitted, carrying its base fields
/// and the unavailable indicator; siblings are never affected. Output order
/// follows completion, not the input listing.
pub async fn enrich_pull_requests(
    client: &GitHubClient,
    repo: &str,
    listing: Vec<GitHubPullRequest>,
    viewer: Option<&str>,
    concurrency: usize,
) -> Vec<PullRequestDetail> {
    let tasks = listing.into_iter().map(|pr| {
        let client = client.clone();
        async move {
            let base = pull_request_from_wire(repo, &pr);
            match enrich_pull_request(&client, repo, pr.number, viewer).await {
                Ok(detail) => detail,
                Err(e) => {
                    log::warn!("enrichment failed for {}: {}", base.subject_key(), e);
                    degraded_detail(base)
                }
            }
        }
    });

    stream::iter(tasks)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::github_client::GitHubUser;

    #[test]
    fn test_parse_timestamp_ms() {
        let ts = parse_timestamp_ms("2024-01-15T10:30:00Z");
        assert!(ts > 0);

        let ts2 = parse_timestamp_ms("2024-01-15T10:30:00+00:00");
        assert_eq!(ts, ts2);

        assert_eq!(parse_timestamp_ms("invalid"), 0);
    }

    #[test]
    fn test_unknown_verdict_defaults_to_commented() {
        let reviews = vec![GitHubReview {
            id: 1,
            user: Some(GitHubUser {
                login: "alice".to_string(),
            }),
            state: "SOMETHING_NEW".to_string(),
            body: None,
            submitted_at: Some("2024-01-15T10:30:00Z".to_string()),
        }];

        let events = review_events_from_wire(&reviews);
        assert_eq!(events[0].verdict, ReviewVerdict::Commented);
    }

    #[test]
    fn test_userless_review_is_dropped() {
        let reviews = vec![GitHubReview {
            id: 1,
            user: None,
            state: "APPROVED".to_string(),
            body: None,
            submitted_at: None,
        }];
        assert!(review_events_from_wire(&reviews).is_empty());
    }

    #[test]
    fn test_missing_updated_at_defaults_to_created_at() {
        let comments = vec![GitHubIssueComment {
            id: 9,
            user: GitHubUser {
                login: "bob".to_string(),
            },
            body: Some("hello".to_string()),
            created_at: "2024-01-15T10:30:00Z".to_string(),
            updated_at: None,
        }];

        let records = general_comments_from_wire(&comments);
        assert_eq!(records[0].updated_at, records[0].created_at);
    }
}
