//! Reconnecting client for the live event feed

use crate::Downloader;
use crate::config::EventFeedConfig;
use crate::error::{Error, Result};
use chrono::Utc;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use tokio_util::sync::CancellationToken;

use super::parser::{FeedLine, FeedPayload, LineBuffer, parse_line};

/// Header carrying the resume cursor on reconnect
const LAST_EVENT_ID: &str = "Last-Event-ID";

/// Connection state of the client
enum StreamState {
    /// Waiting out the retry delay before the next attempt
    Disconnected,
    /// Sending the request
    Connecting,
    /// Reading lines from an open response
    Streaming(reqwest::Response),
}

/// Long-lived subscription to the event feed
///
/// Events are handed to [`Downloader::handle_feed_event`]. A stream that
/// stays silent for `read_timeout` counts as failed. After the stream
/// ends or fails the client waits `retry_delay` and reconnects, sending the
/// last seen event id so the feed can skip what was already delivered.
pub struct EventStreamClient {
    downloader: Downloader,
    config: EventFeedConfig,
    http: reqwest::Client,
    last_event_id: Option<String>,
}

impl EventStreamClient {
    /// Create a client for the given feed
    pub fn new(downloader: Downloader, config: EventFeedConfig) -> Result<Self> {
        // No overall request timeout: the response body is an open-ended stream
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            downloader,
            config,
            http,
            last_event_id: None,
        })
    }

    /// Run until `shutdown` is cancelled
    ///
    /// Connection and stream failures are logged and followed by a reconnect;
    /// they never end the loop.
    pub async fn listen(mut self, shutdown: CancellationToken) {
        let url = self.config.stream_url();
        let mut state = StreamState::Connecting;

        loop {
            state = match state {
                StreamState::Disconnected => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.retry_delay) => {
                            tracing::info!(url = %url, "Attempting to reconnect to event feed");
                            StreamState::Connecting
                        }
                    }
                }
                StreamState::Connecting => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        result = self.connect(&url) => match result {
                            Ok(response) => {
                                tracing::info!(
                                    url = %url,
                                    resume_from = self.last_event_id.as_deref().unwrap_or("-"),
                                    "Connected to event feed"
                                );
                                StreamState::Streaming(response)
                            }
                            Err(e) => {
                                tracing::warn!(url = %url, error = %e, "Event feed connection failed");
                                StreamState::Disconnected
                            }
                        },
                    }
                }
                StreamState::Streaming(response) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        result = self.stream(response) => {
                            match result {
                                Ok(()) => tracing::info!(url = %url, "Event feed closed by server"),
                                Err(e) => tracing::warn!(url = %url, error = %e, "Event feed stream failed"),
                            }
                            StreamState::Disconnected
                        }
                    }
                }
            };
        }

        tracing::info!("Event stream client stopped");
    }

    async fn connect(&self, url: &str) -> Result<reqwest::Response> {
        let mut request = self.http.get(url).header(ACCEPT, "text/event-stream");
        if let Some(id) = &self.last_event_id {
            request = request.header(LAST_EVENT_ID, id);
        }

        let response = tokio::time::timeout(self.config.connect_timeout, request.send())
            .await
            .map_err(|_| {
                Error::Stream(format!(
                    "no response within {:?}",
                    self.config.connect_timeout
                ))
            })??;

        if !response.status().is_success() {
            return Err(Error::Stream(format!(
                "feed returned status {}",
                response.status()
            )));
        }
        Ok(response)
    }

    async fn stream(&mut self, response: reqwest::Response) -> Result<()> {
        let mut body = response.bytes_stream();
        let mut buffer = LineBuffer::default();

        loop {
            let next = tokio::time::timeout(self.config.read_timeout, body.next())
                .await
                .map_err(|_| {
                    Error::Stream(format!(
                        "no data for {:?}, treating connection as dead",
                        self.config.read_timeout
                    ))
                })?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            for line in buffer.push(&chunk) {
                self.process_line(&line).await;
            }
        }
        Ok(())
    }

    async fn process_line(&mut self, line: &str) {
        match parse_line(line) {
            FeedLine::Id(id) => self.last_event_id = Some(id.to_string()),
            FeedLine::Data(data) => self.process_payload(data).await,
            FeedLine::Ignored => {}
        }
    }

    async fn process_payload(&self, data: &str) {
        let payload = match serde_json::from_str::<FeedPayload>(data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, payload = %data, "Skipping malformed feed event");
                return;
            }
        };

        let Some(event) = payload.resolve(&self.config.watch_url_prefix, Utc::now()) else {
            tracing::warn!(payload = %data, "Skipping feed event without a start time");
            return;
        };

        tracing::debug!(url = %event.url, state = ?event.state, "Received feed event");
        if let Err(e) = self.downloader.handle_feed_event(event).await {
            tracing::error!(error = %e, "Failed to handle feed event");
        }
    }
}
