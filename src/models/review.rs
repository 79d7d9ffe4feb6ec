//! Review submission and reviewer status models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Raw outcome of a single review submission, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewVerdict {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

impl ReviewVerdict {
    /// Parse a wire verdict string. Returns `None` for unrecognized values
    /// so the caller can apply the safe-default mapping and log it.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "APPROVED" => Some(Self::Approved),
            "CHANGES_REQUESTED" => Some(Self::ChangesRequested),
            "COMMENTED" => Some(Self::Commented),
            "DISMISSED" => Some(Self::Dismissed),
            "PENDING" => Some(Self::Pending),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReviewVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "APPROVED"),
            Self::ChangesRequested => write!(f, "CHANGES_REQUESTED"),
            Self::Commented => write!(f, "COMMENTED"),
            Self::Dismissed => write!(f, "DISMISSED"),
            Self::Pending => write!(f, "PENDING"),
        }
    }
}

/// One review submission on a pull request.
///
/// The per-PR sequence preserves API order but is not assumed sorted;
/// the reconciler compares `submitted_at` explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    /// Reviewer's login.
    pub reviewer_id: String,

    /// Submission timestamp (epoch milliseconds).
    pub submitted_at: i64,

    /// Raw verdict of the submission.
    pub verdict: ReviewVerdict,

    /// Review summary text, if any.
    pub body: Option<String>,
}

impl ReviewEvent {
    /// Whether the submission carries non-empty body text.
    pub fn has_body(&self) -> bool {
        self.body
            .as_deref()
            .map(|b| !b.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Canonical single-value review status attributed to one person on one PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerStatus {
    Approved,
    ChangesRequested,
    Commented,
    ReviewRequested,
    Dismissed,
}

impl ReviewerStatus {
    /// Translate a raw verdict into the output vocabulary.
    ///
    /// `PENDING` means the platform is still waiting on this reviewer.
    pub fn from_verdict(verdict: ReviewVerdict) -> Self {
        match verdict {
            ReviewVerdict::Approved => Self::Approved,
            ReviewVerdict::ChangesRequested => Self::ChangesRequested,
            ReviewVerdict::Commented => Self::Commented,
            ReviewVerdict::Dismissed => Self::Dismissed,
            ReviewVerdict::Pending => Self::ReviewRequested,
        }
    }
}

impl std::fmt::Display for ReviewerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::ChangesRequested => write!(f, "changes_requested"),
            Self::Commented => write!(f, "commented"),
            Self::ReviewRequested => write!(f, "review_requested"),
            Self::Dismissed => write!(f, "dismissed"),
        }
    }
}

/// Derived per-reviewer state for one pull request.
///
/// Recomputed fully on every fetch, never partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerState {
    /// Reviewer's login.
    pub reviewer_id: String,

    /// Canonical status after reconciliation.
    pub status: ReviewerStatus,

    /// Whether the reviewer has left any comment text.
    pub has_comments: bool,

    /// Timestamp of the reviewer's latest observed activity (epoch ms).
    pub last_activity_at: i64,

    /// Whether this entry is the current viewer.
    pub is_current_viewer: bool,
}

/// The two requested-reviewer sources for one pull request.
///
/// `primary` is embedded in the PR descriptor; `secondary` comes from the
/// dedicated requested-reviewers endpoint. Either may lag the other, so the
/// reconciler treats their union as "currently awaiting review".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestedReviewers {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

impl RequestedReviewers {
    /// Deduplicated union of both sources, sorted by login.
    pub fn union(&self) -> Vec<&str> {
        self.primary
            .iter()
            .chain(self.secondary.iter())
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether either source currently lists the given login.
    pub fn contains(&self, reviewer_id: &str) -> bool {
        self.primary.iter().any(|r| r == reviewer_id)
            || self.secondary.iter().any(|r| r == reviewer_id)
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }
}
