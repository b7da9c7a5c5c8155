//! Completion destinations consumed when a download finishes.

use crate::error::DatabaseError;
use crate::types::Destination;
use crate::{Error, Result};

use super::Database;

impl Database {
    /// Register a destination to be notified when `url` finishes
    ///
    /// Idempotent: registering the same destination twice is a no-op.
    /// Returns true if a new row was inserted.
    pub async fn add_completion(&self, destination: Destination, url: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO completion_destinations (guild_id, channel_id, url, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(destination.guild_id)
        .bind(destination.channel_id)
        .bind(url)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to add completion destination: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Get every destination registered for `url`, in registration order
    pub async fn get_completions(&self, url: &str) -> Result<Vec<Destination>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT guild_id, channel_id
            FROM completion_destinations
            WHERE url = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(url)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get completion destinations: {}",
                e
            )))
        })?;

        Ok(rows
            .into_iter()
            .map(|(guild_id, channel_id)| Destination::new(guild_id, channel_id))
            .collect())
    }

    /// Delete a single destination registration for `url`
    pub async fn delete_completion(&self, destination: Destination, url: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM completion_destinations
            WHERE guild_id = ? AND channel_id = ? AND url = ?
            "#,
        )
        .bind(destination.guild_id)
        .bind(destination.channel_id)
        .bind(url)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to delete completion destination: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every destination registered for `url`
    pub async fn delete_completions(&self, url: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM completion_destinations WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete completion destinations: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
