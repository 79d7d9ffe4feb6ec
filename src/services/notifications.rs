//! Notification/unread engine.
//!
//! Computes per-reviewer unread counts and urgency from the persisted
//! acknowledgement ledger. Every operation takes the current time as an
//! explicit argument so seeding, counting, and the sweep are testable
//! without a wall clock; [`now_ms`] supplies it in production.

use crate::db::ledger;
use crate::error::AppError;
use crate::models::{CommentRecord, UnreadInfo, Urgency};
use sqlx::SqlitePool;
use std::time::{SystemTime, UNIX_EPOCH};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Fresh-start seeding for a subject.
///
/// The first observation of a subject records `now_ms` for every reviewer
/// present, so pre-existing activity is treated as already acknowledged and
/// history never floods the badges. A reviewer first seen later on an
/// existing subject is seeded at their own first observation. Existing
/// entries are never touched.
///
/// Returns the number of newly created entries.
pub async fn observe_subject(
    pool: &SqlitePool,
    subject_key: &str,
    reviewer_ids: &[String],
    now_ms: i64,
) -> Result<usize, AppError> {
    let mut seeded = 0;
    for reviewer_id in reviewer_ids {
        if ledger::seed_entry(pool, subject_key, reviewer_id, now_ms).await? {
            seeded += 1;
        }
    }
    Ok(seeded)
}

/// A comment is unread once it was created after the acknowledgement, or
/// edited after both the acknowledgement and its own creation. The second
/// clause keeps unedited comments (where the platform reports the edit time
/// equal to creation) from counting twice.
fn is_unread(comment: &CommentRecord, last_acknowledged_at: i64) -> bool {
    comment.created_at > last_acknowledged_at
        || (comment.updated_at > last_acknowledged_at && comment.updated_at > comment.created_at)
}

/// Classify urgency from the newest unread item's age. The day boundaries
/// are inclusive: exactly one day is already a warning, exactly two days is
/// already urgent.
fn classify_urgency(age_days: f64) -> Urgency {
    if age_days >= 2.0 {
        Urgency::Urgent
    } else if age_days >= 1.0 {
        Urgency::Warning
    } else {
        Urgency::Normal
    }
}

/// Compute the unread badge for one reviewer on one subject.
///
/// `comments` is the full comment set for the subject; only comments
/// authored by `reviewer_id` are counted. An unseeded (subject, reviewer)
/// pair is seeded at `now_ms` and reports zero unread.
pub async fn unread_info(
    pool: &SqlitePool,
    subject_key: &str,
    reviewer_id: &str,
    comments: &[CommentRecord],
    now_ms: i64,
) -> Result<UnreadInfo, AppError> {
    let last_acknowledged_at =
        match ledger::get_acknowledged_at(pool, subject_key, reviewer_id).await? {
            Some(ts) => ts,
            None => {
                ledger::seed_entry(pool, subject_key, reviewer_id, now_ms).await?;
                return Ok(UnreadInfo::none());
            }
        };

    let unread: Vec<&CommentRecord> = comments
        .iter()
        .filter(|c| c.author_id == reviewer_id && is_unread(c, last_acknowledged_at))
        .collect();

    if unread.is_empty() {
        return Ok(UnreadInfo::none());
    }

    let newest = unread
        .iter()
        .map(|c| c.last_touched_at())
        .max()
        .unwrap_or(now_ms);
    let age_days = ((now_ms - newest).max(0)) as f64 / MS_PER_DAY;

    Ok(UnreadInfo {
        count: unread.len(),
        urgency: classify_urgency(age_days),
        newest_unread_age_days: age_days,
    })
}

/// Acknowledge one reviewer's activity on one subject.
///
/// Invoked when the viewer opens the reviewer's comment list. Idempotent;
/// concurrent acknowledgements on different keys never conflict and
/// last-writer-wins is acceptable for the same key.
pub async fn acknowledge(
    pool: &SqlitePool,
    subject_key: &str,
    reviewer_id: &str,
    now_ms: i64,
) -> Result<(), AppError> {
    ledger::set_acknowledged_at(pool, subject_key, reviewer_id, now_ms).await?;
    Ok(())
}

/// Opportunistic garbage collection of entries idle longer than the
/// retention window. Returns the number of entries removed.
pub async fn sweep_idle_entries(pool: &SqlitePool, now_ms: i64) -> Result<u64, AppError> {
    let removed = ledger::delete_idle_entries(pool, now_ms).await?;
    if removed > 0 {
        log::debug!("notification ledger sweep removed {} idle entries", removed);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommentKind;

    fn comment(author: &str, created_at: i64, updated_at: i64) -> CommentRecord {
        CommentRecord {
            id: created_at,
            author_id: author.to_string(),
            created_at,
            updated_at,
            body: "text".to_string(),
            kind: CommentKind::General,
            file_path: None,
            line: None,
            original_line: None,
            side: None,
            in_reply_to_id: None,
        }
    }

    #[test]
    fn test_unread_rule() {
        // Created after acknowledgement.
        assert!(is_unread(&comment("a", 200, 200), 100));
        // Created and untouched before acknowledgement.
        assert!(!is_unread(&comment("a", 50, 50), 100));
        // Old comment edited after acknowledgement.
        assert!(is_unread(&comment("a", 50, 150), 100));
        // Edit time equal to creation never counts as an edit.
        assert!(!is_unread(&comment("a", 50, 50), 50));
    }

    #[test]
    fn test_urgency_boundaries_are_inclusive() {
        assert_eq!(classify_urgency(0.5), Urgency::Normal);
        assert_eq!(classify_urgency(1.0), Urgency::Warning);
        assert_eq!(classify_urgency(1.9), Urgency::Warning);
        assert_eq!(classify_urgency(2.0), Urgency::Urgent);
        assert_eq!(classify_urgency(14.0), Urgency::Urgent);
    }
}
