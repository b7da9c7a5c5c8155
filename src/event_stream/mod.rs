//! External event feed
//!
//! A long-lived connection to a feed that announces waiting rooms and live
//! streams as `id:`/`data:` lines. Events for subscribed channels become
//! deferred live captures or immediate ones.
//!
//! - [`client`] - Connection state machine and resume cursor
//! - [`parser`] - Line framing and payload resolution
//! - [`handler`] - Mapping events onto the task manager

mod client;
mod handler;
mod parser;


pub use client::EventStreamClient;
pub use parser::{FeedEvent, RoomState};
