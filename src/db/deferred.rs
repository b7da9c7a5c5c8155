//! Deferred download entries and the scheduler hand-off.

use crate::error::DatabaseError;
use crate::types::FetchMode;
use crate::{Error, Result};

use super::{Database, DeferredEntry, DeferredRow};

impl Database {
    /// Schedule (or re-schedule) a download for a future instant
    ///
    /// Conflicts on the URL overwrite the due time and mode and re-arm an entry
    /// that was previously cancelled.
    pub async fn upsert_deferred(&self, url: &str, due_at: i64, mode: FetchMode) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO deferred_downloads (url, due_at, valid, mode, created_at)
            VALUES (?, ?, 1, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                due_at = excluded.due_at,
                valid = excluded.valid,
                mode = excluded.mode
            "#,
        )
        .bind(url)
        .bind(due_at)
        .bind(mode.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert deferred download: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Insert a deferred entry only if none exists for the URL
    ///
    /// Used for externally reported items: an entry that was cancelled (valid = 0)
    /// must not be re-armed by a late notification. Returns true if a row was inserted.
    pub async fn insert_deferred_if_absent(
        &self,
        url: &str,
        due_at: i64,
        mode: FetchMode,
    ) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO deferred_downloads (url, due_at, valid, mode, created_at)
            VALUES (?, ?, 1, ?, ?)
            "#,
        )
        .bind(url)
        .bind(due_at)
        .bind(mode.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert deferred download: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Select every valid entry due before `horizon` and delete it in the same transaction
    ///
    /// This is the scheduler hand-off: once returned, an entry is no longer in
    /// the store and cannot be selected again by a later tick.
    pub async fn take_due_deferred(&self, horizon: i64) -> Result<Vec<DeferredEntry>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        let rows = sqlx::query_as::<_, DeferredRow>(
            r#"
            SELECT url, due_at, valid, mode
            FROM deferred_downloads
            WHERE due_at < ? AND valid <> 0
            ORDER BY due_at ASC
            "#,
        )
        .bind(horizon)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to select due downloads: {}",
                e
            )))
        })?;

        for row in &rows {
            sqlx::query("DELETE FROM deferred_downloads WHERE url = ?")
                .bind(&row.url)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to delete due download: {}",
                        e
                    )))
                })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit due download hand-off: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(DeferredEntry::from).collect())
    }

    /// Get the deferred entry for a URL, valid or not
    pub async fn get_deferred(&self, url: &str) -> Result<Option<DeferredEntry>> {
        let row = sqlx::query_as::<_, DeferredRow>(
            r#"
            SELECT url, due_at, valid, mode
            FROM deferred_downloads
            WHERE url = ?
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get deferred download: {}",
                e
            )))
        })?;

        Ok(row.map(DeferredEntry::from))
    }

    /// List all valid deferred entries, soonest first
    pub async fn get_scheduled_downloads(&self) -> Result<Vec<DeferredEntry>> {
        let rows = sqlx::query_as::<_, DeferredRow>(
            r#"
            SELECT url, due_at, valid, mode
            FROM deferred_downloads
            WHERE valid <> 0
            ORDER BY due_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list scheduled downloads: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(DeferredEntry::from).collect())
    }

    /// Mark a valid deferred entry as cancelled without deleting it
    ///
    /// Returns true if a valid entry existed and was invalidated.
    pub async fn invalidate_deferred(&self, url: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE deferred_downloads SET valid = 0 WHERE url = ? AND valid <> 0")
                .bind(url)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to invalidate deferred download: {}",
                        e
                    )))
                })?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard-delete the deferred entry for a URL
    pub async fn delete_deferred(&self, url: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM deferred_downloads WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete deferred download: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every entry (valid or not) whose due time is before `cutoff`
    ///
    /// Returns the number of rows removed.
    pub async fn delete_stale_deferred(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM deferred_downloads WHERE due_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete stale deferred downloads: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
