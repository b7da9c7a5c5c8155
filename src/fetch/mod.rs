//! Content fetch engine integration
//!
//! The scheduler never downloads bytes itself; it drives a [`FetchEngine`],
//! which knows how to read a URL's metadata, download it, and remux live
//! captures afterwards.
//!
//! ## Architecture
//!
//! - [`CliFetchEngine`]: Runs the external `yt-dlp` binary (and `ffmpeg` for remuxing)
//! - [`NoOpFetchEngine`]: Stub implementation when no binary is available
//!
//! ## Usage
//!
//! ```no_run
//! use stream_dl::fetch::{CliFetchEngine, FetchEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = CliFetchEngine::from_path().expect("yt-dlp binary not found");
//!
//!     let info = engine
//!         .probe_metadata("https://www.youtube.com/watch?v=jNQXAC9IVRw")
//!         .await?;
//!     println!("live status: {:?}", info.live_status);
//!
//!     Ok(())
//! }
//! ```

mod cli;
mod noop;
mod parser;
mod traits;

pub use cli::CliFetchEngine;
pub use noop::NoOpFetchEngine;
pub use traits::{FetchEngine, FetchOutput, FetchRequest};
