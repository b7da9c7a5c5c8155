//! Source channel subscriptions.
//!
//! Source channel ids are stored lowercased; every lookup lowercases its
//! argument so matching is case-insensitive.

use crate::error::DatabaseError;
use crate::types::{Destination, RoomKind};
use crate::{Error, Result};

use super::{Database, Subscription, SubscriptionRow};

impl Database {
    /// Subscribe a destination to a source channel and room kind
    ///
    /// Unique per (guild, source, kind); an existing subscription is left as is.
    /// Returns true if a new row was inserted.
    pub async fn add_subscription(
        &self,
        destination: Destination,
        source_channel_id: &str,
        kind: RoomKind,
    ) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO subscriptions (guild_id, channel_id, source_channel_id, kind, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(destination.guild_id)
        .bind(destination.channel_id)
        .bind(source_channel_id.to_lowercase())
        .bind(kind.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to add subscription: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a guild's subscription to a source channel
    ///
    /// With `kind = None` every kind for the source is removed.
    /// Returns the number of subscriptions removed.
    pub async fn remove_subscription(
        &self,
        guild_id: i64,
        source_channel_id: &str,
        kind: Option<RoomKind>,
    ) -> Result<u64> {
        let source = source_channel_id.to_lowercase();

        let query = match kind {
            Some(kind) => sqlx::query(
                r#"
                DELETE FROM subscriptions
                WHERE guild_id = ? AND source_channel_id = ? AND kind = ?
                "#,
            )
            .bind(guild_id)
            .bind(source)
            .bind(kind.as_str()),
            None => sqlx::query(
                r#"
                DELETE FROM subscriptions
                WHERE guild_id = ? AND source_channel_id = ?
                "#,
            )
            .bind(guild_id)
            .bind(source),
        };

        let result = query.execute(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to remove subscription: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Get every destination subscribed to a source channel and room kind
    pub async fn get_subscription_destinations(
        &self,
        source_channel_id: &str,
        kind: RoomKind,
    ) -> Result<Vec<Destination>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT guild_id, channel_id
            FROM subscriptions
            WHERE source_channel_id = ? AND kind = ?
            ORDER BY guild_id ASC, channel_id ASC
            "#,
        )
        .bind(source_channel_id.to_lowercase())
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get subscription destinations: {}",
                e
            )))
        })?;

        Ok(rows
            .into_iter()
            .map(|(guild_id, channel_id)| Destination::new(guild_id, channel_id))
            .collect())
    }

    /// List a guild's subscriptions
    pub async fn get_subscriptions(&self, guild_id: i64) -> Result<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT guild_id, channel_id, source_channel_id, kind
            FROM subscriptions
            WHERE guild_id = ?
            ORDER BY source_channel_id ASC, kind ASC
            "#,
        )
        .bind(guild_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list subscriptions: {}",
                e
            )))
        })?;

        let mut subscriptions = Vec::with_capacity(rows.len());
        for row in rows {
            match Subscription::try_from(row) {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => tracing::warn!(guild_id, error = %e, "Skipping unreadable subscription"),
            }
        }

        Ok(subscriptions)
    }
}
