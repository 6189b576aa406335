//! Now-playing metadata resolution for live radio streams
//!
//! A live audio stream offers no random access and no structured
//! out-of-band channel by default, so "what song is playing right now" has
//! to be discovered. This crate does that through three independent sources,
//! consulted in fixed priority order until one yields a usable result:
//!
//! - **In-band ICY metadata** ([`icy`]): decode the metadata blocks that
//!   Shoutcast/Icecast servers multiplex into the audio byte stream at a
//!   connection-negotiated interval
//! - **Schedule API** ([`schedule`]): poll the broadcaster's JSON schedule
//!   endpoint for the entry marked on air
//! - **Livestream page** ([`scrape`]): scrape the public livestream page
//!   with two CSS selectors
//!
//! A change-detection cache sits between the sources and the consumer
//! ([`resolver`]): an event carrying both old and new values is emitted only
//! when the resolved track actually differs, never on every poll tick.
//! Transient source failures are logged and absorbed; the last known track
//! is retained until a source succeeds again.
//!
//! # Example
//!
//! ```no_run
//! use pmonowplaying::{MetadataResolver, ResolverWorker, DEFAULT_POLL_INTERVAL_SECS};
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // No global timeout on the client: the stream connection stays open
//!     // across ticks. Each source enforces its own per-attempt deadline.
//!     let client = reqwest::Client::new();
//!     let resolver = MetadataResolver::with_default_sources(client)?;
//!
//!     let (events_tx, mut events_rx) = mpsc::channel(8);
//!     let (worker, commands) = ResolverWorker::spawn(
//!         resolver,
//!         Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
//!         events_tx,
//!     );
//!
//!     while let Some(event) = events_rx.recv().await {
//!         println!("Now playing: {}", event.current);
//!     }
//!
//!     drop(commands);
//!     worker.wait().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Custom chains
//!
//! The three built-in sources all implement [`NowPlayingSource`]; a resolver
//! can be built over any ordered list of sources via
//! [`MetadataResolver::new`], including custom implementations.
//!
//! # Protocol note
//!
//! The in-band decoder populates the artist field from the `StreamUrl` wire
//! field, matching the upstream mapping this crate is compatible with. Most
//! servers emit only `StreamTitle`, often formatted as `"Artist - Title"`;
//! see [`icy::parse_metadata_block`].

pub mod error;
pub mod icy;
pub mod models;
pub mod resolver;
pub mod schedule;
pub mod scrape;
pub mod source;
pub mod worker;

// Re-exports
pub use error::{Error, Result};
pub use icy::{IcyStreamSource, DEFAULT_STREAM_URL};
pub use models::{
    ChangeEvent, NowPlaying, OnAirItem, ScheduleEntry, ScheduleResponse, UNKNOWN_ARTIST,
    UNKNOWN_TITLE,
};
pub use resolver::MetadataResolver;
pub use schedule::{ScheduleSource, DEFAULT_SCHEDULE_URL};
pub use scrape::{LivePageSource, DEFAULT_LIVE_PAGE_URL};
pub use source::NowPlayingSource;
pub use worker::{ResolverWorker, WorkerCommand, DEFAULT_POLL_INTERVAL_SECS};
