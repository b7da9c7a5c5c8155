//! Subscription registry
//!
//! Maps a source channel and room kind to the chat destinations that want to
//! hear about it. The event stream client fans a single feed event out to
//! every destination returned by [`SubscriptionRegistry::destinations_for`].

use crate::db::{Database, Subscription};
use crate::error::{Error, Result};
use crate::types::{Destination, RoomKind};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Durable source → destinations mapping
#[derive(Clone)]
pub struct SubscriptionRegistry {
    db: Arc<Database>,
}

impl SubscriptionRegistry {
    /// Create a registry backed by the given database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Subscribe a destination to a source channel
    ///
    /// Idempotent per `(guild_id, source_channel_id, kind)`. Returns true if a
    /// new subscription was created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty source id, or a database error.
    pub async fn subscribe(
        &self,
        source_channel_id: &str,
        kind: RoomKind,
        guild_id: i64,
        channel_id: i64,
    ) -> Result<bool> {
        let source = normalize_source(source_channel_id)?;
        let created = self
            .db
            .add_subscription(Destination::new(guild_id, channel_id), source, kind)
            .await?;

        if created {
            tracing::info!(source = %source, kind = %kind, guild_id, channel_id, "Subscribed");
        }
        Ok(created)
    }

    /// Remove a guild's subscriptions to a source channel
    ///
    /// Without `kind` every kind is removed. Returns the number removed.
    pub async fn unsubscribe(
        &self,
        source_channel_id: &str,
        kind: Option<RoomKind>,
        guild_id: i64,
    ) -> Result<u64> {
        let source = normalize_source(source_channel_id)?;
        let removed = self.db.remove_subscription(guild_id, source, kind).await?;

        tracing::info!(source = %source, ?kind, guild_id, removed, "Unsubscribed");
        Ok(removed)
    }

    /// Every destination subscribed to `source_channel_id` for `kind`
    pub async fn destinations_for(
        &self,
        source_channel_id: &str,
        kind: RoomKind,
    ) -> Result<BTreeSet<Destination>> {
        let source = source_channel_id.trim();
        if source.is_empty() {
            return Ok(BTreeSet::new());
        }
        let destinations = self.db.get_subscription_destinations(source, kind).await?;
        Ok(destinations.into_iter().collect())
    }

    /// Subscriptions held by a guild
    pub async fn list(&self, guild_id: i64) -> Result<Vec<Subscription>> {
        self.db.get_subscriptions(guild_id).await
    }
}

fn normalize_source(source_channel_id: &str) -> Result<&str> {
    let source = source_channel_id.trim();
    if source.is_empty() {
        return Err(Error::Config {
            message: "source channel id must not be empty".into(),
            key: None,
        });
    }
    Ok(source)
}
