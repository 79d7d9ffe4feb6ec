//! Database queries for the notification ledger.
//!
//! Each operation is scoped to a single (subject, reviewer) key, so
//! concurrent acknowledgements on different keys never conflict and
//! last-writer-wins is acceptable for same-key races.

use crate::models::LedgerEntry;
use sqlx::SqlitePool;

/// Number of idle days after which a ledger entry is swept.
pub const SWEEP_IDLE_DAYS: i64 = 30;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Get the acknowledgement timestamp for one (subject, reviewer) key.
pub async fn get_acknowledged_at(
    pool: &SqlitePool,
    subject_key: &str,
    reviewer_id: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT last_acknowledged_at
        FROM notification_ledger
        WHERE subject_key = ? AND reviewer_id = ?
        "#,
    )
    .bind(subject_key)
    .bind(reviewer_id)
    .fetch_optional(pool)
    .await
}

/// Seed an entry if it does not exist yet; an existing entry is untouched.
///
/// Returns true when a new entry was created.
pub async fn seed_entry(
    pool: &SqlitePool,
    subject_key: &str,
    reviewer_id: &str,
    now_ms: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO notification_ledger (subject_key, reviewer_id, last_acknowledged_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(subject_key)
    .bind(reviewer_id)
    .bind(now_ms)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Set the acknowledgement timestamp for one key, creating it if needed.
pub async fn set_acknowledged_at(
    pool: &SqlitePool,
    subject_key: &str,
    reviewer_id: &str,
    now_ms: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notification_ledger (subject_key, reviewer_id, last_acknowledged_at)
        VALUES (?, ?, ?)
        ON CONFLICT(subject_key, reviewer_id) DO UPDATE SET
            last_acknowledged_at = excluded.last_acknowledged_at
        "#,
    )
    .bind(subject_key)
    .bind(reviewer_id)
    .bind(now_ms)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether any entry exists for the subject.
pub async fn subject_exists(pool: &SqlitePool, subject_key: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM notification_ledger WHERE subject_key = ? LIMIT 1")
            .bind(subject_key)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// List all entries for one subject.
pub async fn entries_for_subject(
    pool: &SqlitePool,
    subject_key: &str,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT subject_key, reviewer_id, last_acknowledged_at
        FROM notification_ledger
        WHERE subject_key = ?
        ORDER BY reviewer_id
        "#,
    )
    .bind(subject_key)
    .fetch_all(pool)
    .await
}

/// Remove entries idle longer than [`SWEEP_IDLE_DAYS`].
///
/// Best-effort and non-transactional; safe to run concurrently with reads.
/// Returns the number of entries removed.
pub async fn delete_idle_entries(pool: &SqlitePool, now_ms: i64) -> Result<u64, sqlx::Error> {
    let cutoff = now_ms - SWEEP_IDLE_DAYS * MS_PER_DAY;

    let result = sqlx::query("DELETE FROM notification_ledger WHERE last_acknowledged_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("test.db"))
            .await
            .unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn test_seed_does_not_overwrite() {
        let (_dir, pool) = test_pool().await;

        assert!(seed_entry(&pool, "octo/widgets#1", "alice", 100).await.unwrap());
        assert!(!seed_entry(&pool, "octo/widgets#1", "alice", 999).await.unwrap());

        let ack = get_acknowledged_at(&pool, "octo/widgets#1", "alice")
            .await
            .unwrap();
        assert_eq!(ack, Some(100));
    }

    #[tokio::test]
    async fn test_set_is_idempotent_upsert() {
        let (_dir, pool) = test_pool().await;

        set_acknowledged_at(&pool, "octo/widgets#1", "bob", 100)
            .await
            .unwrap();
        set_acknowledged_at(&pool, "octo/widgets#1", "bob", 200)
            .await
            .unwrap();
        set_acknowledged_at(&pool, "octo/widgets#1", "bob", 200)
            .await
            .unwrap();

        let ack = get_acknowledged_at(&pool, "octo/widgets#1", "bob")
            .await
            .unwrap();
        assert_eq!(ack, Some(200));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_idle_entries() {
        let (_dir, pool) = test_pool().await;
        let now = 100 * MS_PER_DAY;

        // 40 days idle, should be swept
        set_acknowledged_at(&pool, "octo/widgets#1", "alice", now - 40 * MS_PER_DAY)
            .await
            .unwrap();
        // 10 days idle, should survive
        set_acknowledged_at(&pool, "octo/widgets#2", "alice", now - 10 * MS_PER_DAY)
            .await
            .unwrap();

        let removed = delete_idle_entries(&pool, now).await.unwrap();
        assert_eq!(removed, 1);

        assert!(get_acknowledged_at(&pool, "octo/widgets#1", "alice")
            .await
            .unwrap()
            .is_none());
        assert!(get_acknowledged_at(&pool, "octo/widgets#2", "alice")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_entries_for_subject_sorted() {
        let (_dir, pool) = test_pool().await;

        set_acknowledged_at(&pool, "octo/widgets#1", "carol", 1)
            .await
            .unwrap();
        set_acknowledged_at(&pool, "octo/widgets#1", "alice", 2)
            .await
            .unwrap();

        let entries = entries_for_subject(&pool, "octo/widgets#1").await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.reviewer_id.as_str()).collect();
        assert_eq!(names, vec!["alice", "carol"]);
        assert!(subject_exists(&pool, "octo/widgets#1").await.unwrap());
        assert!(!subject_exists(&pool, "octo/widgets#9").await.unwrap());
    }
}
