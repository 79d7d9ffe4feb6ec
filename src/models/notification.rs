//! Unread-activity models backing the reviewer badges.

use serde::Serialize;
use sqlx::FromRow;

/// Urgency classification of a reviewer's unread activity, derived from the
/// age of the newest unread item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// No unread activity.
    None,
    /// Newest unread item is less than a day old.
    Normal,
    /// Newest unread item is between one and two days old.
    Warning,
    /// Newest unread item is two or more days old.
    Urgent,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Normal => write!(f, "normal"),
            Self::Warning => write!(f, "warning"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

/// Per-reviewer unread badge payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadInfo {
    /// Number of unread comments by this reviewer.
    pub count: usize,

    pub urgency: Urgency,

    /// Age of the newest unread item in (fractional) days. Zero when there
    /// is no unread activity.
    pub newest_unread_age_days: f64,
}

impl UnreadInfo {
    /// The all-read badge.
    pub fn none() -> Self {
        Self {
            count: 0,
            urgency: Urgency::None,
            newest_unread_age_days: 0.0,
        }
    }
}

/// Persisted acknowledgement record for one (subject, reviewer) pair.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Subject identifier: `owner/repo#number`.
    pub subject_key: String,

    /// Reviewer's login.
    pub reviewer_id: String,

    /// When the viewer last acknowledged this reviewer's activity (epoch ms).
    pub last_acknowledged_at: i64,
}
