//! Line framing and payload resolution for the event feed

use crate::types::RoomKind;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Meaning of one line of the feed
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FeedLine<'a> {
    /// JSON payload of an event
    Data(&'a str),
    /// Resume cursor
    Id(&'a str),
    /// Comments, `event:`/`retry:` fields and blank separators
    Ignored,
}

pub(crate) fn parse_line(line: &str) -> FeedLine<'_> {
    if let Some(data) = line.strip_prefix("data:") {
        FeedLine::Data(data.trim())
    } else if let Some(id) = line.strip_prefix("id:") {
        FeedLine::Id(id.trim())
    } else {
        FeedLine::Ignored
    }
}

/// Splits a byte stream into lines
///
/// Accepts `\n` and `\r\n` terminators. A trailing partial line is kept until
/// the chunk that completes it arrives.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

/// Stage of a room as reported by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum RoomStage {
    Waiting,
    Live,
}

/// Raw event payload
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FeedPayload {
    pub(crate) channel_id: String,
    pub(crate) video_id: String,
    #[serde(default)]
    pub(crate) title: Option<String>,
    pub(crate) kind: RoomKind,
    #[serde(default)]
    pub(crate) utcepoch: Option<i64>,
    #[serde(default)]
    pub(crate) state: Option<RoomStage>,
    #[serde(default)]
    pub(crate) url: Option<String>,
}

/// Where a reported item stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Waiting room open; goes live at the given instant
    Waiting(DateTime<Utc>),
    /// Live now
    Live,
}

/// An event resolved against the current time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    /// Content URL
    pub url: String,
    /// Source channel that published it
    pub source_channel_id: String,
    /// Stream or premiere
    pub kind: RoomKind,
    /// Title, when the feed supplied one
    pub title: Option<String>,
    /// Waiting or live
    pub state: RoomState,
}

impl FeedPayload {
    /// Resolve the payload into an event
    ///
    /// Without an explicit `state`, an item is waiting iff its `utcepoch` lies
    /// in the future. A waiting item without a usable `utcepoch` cannot be
    /// scheduled and resolves to `None`.
    pub(crate) fn resolve(self, watch_url_prefix: &str, now: DateTime<Utc>) -> Option<FeedEvent> {
        let at = self
            .utcepoch
            .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0));

        let state = match (self.state, at) {
            (Some(RoomStage::Live), _) => RoomState::Live,
            (Some(RoomStage::Waiting), Some(at)) => RoomState::Waiting(at),
            (Some(RoomStage::Waiting), None) => return None,
            (None, Some(at)) if at > now => RoomState::Waiting(at),
            (None, _) => RoomState::Live,
        };

        let url = match self.url {
            Some(url) if !url.trim().is_empty() => url,
            _ => format!("{}{}", watch_url_prefix, self.video_id),
        };

        Some(FeedEvent {
            url,
            source_channel_id: self.channel_id,
            kind: self.kind,
            title: self.title,
            state,
        })
    }
}
