//! Turning feed events into deferred entries and live captures

use crate::Downloader;
use crate::error::Result;
use crate::types::{Event, FetchMode, Launch};

use super::parser::{FeedEvent, RoomState};

impl Downloader {
    /// Act on one resolved feed event
    ///
    /// Events nobody subscribed to are dropped. For a waiting room a deferred
    /// live-capture entry is inserted unless one already exists (an entry
    /// cancelled by a user stays cancelled), and every subscriber is
    /// registered as a completion destination. For a live item the
    /// destinations are registered, the waiting-room entry (if any) is
    /// removed, a live capture is launched, and each subscriber is told the
    /// capture started.
    ///
    /// Returns the number of subscribers the event reached.
    pub async fn handle_feed_event(&self, event: FeedEvent) -> Result<usize> {
        let registry = self.subscriptions();
        let destinations = registry
            .destinations_for(&event.source_channel_id, event.kind)
            .await?;

        if destinations.is_empty() {
            tracing::debug!(
                source = %event.source_channel_id,
                kind = %event.kind,
                url = %event.url,
                "No subscribers for feed event"
            );
            return Ok(0);
        }

        if let Some(entry) = self.db.get_deferred(&event.url).await? {
            if !entry.valid {
                tracing::info!(url = %event.url, "Ignoring feed event for cancelled download");
                return Ok(0);
            }
        }

        match event.state {
            RoomState::Waiting(at) => {
                let inserted = self
                    .db
                    .insert_deferred_if_absent(&event.url, at.timestamp(), FetchMode::LiveCapture)
                    .await?;
                for destination in &destinations {
                    self.db.add_completion(*destination, &event.url).await?;
                }

                if inserted {
                    tracing::info!(
                        url = %event.url,
                        due_at = %at,
                        subscribers = destinations.len(),
                        "Scheduled capture from waiting room"
                    );
                    self.emit_event(Event::Deferred {
                        url: event.url.clone(),
                        due_at: at,
                    });
                } else {
                    tracing::debug!(url = %event.url, "Waiting room already known");
                }
            }
            RoomState::Live => {
                for destination in &destinations {
                    self.db.add_completion(*destination, &event.url).await?;
                }

                // The waiting-room entry is handed to the capture, not left for the scheduler
                if self.db.delete_deferred(&event.url).await? {
                    tracing::debug!(url = %event.url, "Waiting room went live, deferred entry removed");
                }

                let launch = self
                    .launch(&event.url, None, true, FetchMode::LiveCapture)
                    .await?;
                if launch == Launch::AlreadyRunning {
                    return Ok(destinations.len());
                }

                let message = match &event.title {
                    Some(title) => format!("Started live capture of {title} ({})", event.url),
                    None => format!("Started live capture of {}", event.url),
                };
                for destination in &destinations {
                    if let Err(e) = self
                        .notifier
                        .send_message(destination.guild_id, destination.channel_id, &message)
                        .await
                    {
                        tracing::warn!(
                            url = %event.url,
                            guild_id = destination.guild_id,
                            error = %e,
                            "Live capture notification failed"
                        );
                    }
                }
            }
        }

        Ok(destinations.len())
    }
}
