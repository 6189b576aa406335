//! Multi-source resolution and change detection
//!
//! The resolver walks its sources in fixed priority order, takes the first
//! usable result, and compares it against the single cached value it owns.
//! A [`ChangeEvent`] is produced only when the pair actually differs, so
//! downstream consumers re-render on genuine track changes, not on every
//! poll tick.

use crate::error::Result;
use crate::icy::{IcyStreamSource, DEFAULT_STREAM_URL};
use crate::models::{ChangeEvent, NowPlaying};
use crate::schedule::{ScheduleSource, DEFAULT_SCHEDULE_URL};
use crate::scrape::{LivePageSource, DEFAULT_LIVE_PAGE_URL};
use crate::source::NowPlayingSource;
use reqwest::Client;
use tracing::{debug, info, warn};

/// Orchestrates the fallback chain and owns the change-detection cache
///
/// The cache is a plain owned field, written only inside [`resolve`]
/// (`&mut self` serializes compare-then-write) and read through
/// [`current`]. It holds at most the single most-recently-emitted value;
/// there is no history.
///
/// [`resolve`]: MetadataResolver::resolve
/// [`current`]: MetadataResolver::current
pub struct MetadataResolver {
    sources: Vec<Box<dyn NowPlayingSource>>,
    current: Option<NowPlaying>,
}

impl MetadataResolver {
    /// Build a resolver over `sources`, consulted in the given order
    pub fn new(sources: Vec<Box<dyn NowPlayingSource>>) -> Self {
        Self {
            sources,
            current: None,
        }
    }

    /// Build the standard chain: in-band stream metadata, then the schedule
    /// API, then the livestream page, all against their default URLs.
    ///
    /// `client` is shared by all three sources and must not carry a global
    /// request timeout (the stream connection stays open across ticks);
    /// every source enforces its own per-attempt deadline.
    pub fn with_default_sources(client: Client) -> Result<Self> {
        Ok(Self::new(vec![
            Box::new(IcyStreamSource::new(client.clone(), DEFAULT_STREAM_URL)?),
            Box::new(ScheduleSource::new(client.clone(), DEFAULT_SCHEDULE_URL)?),
            Box::new(LivePageSource::new(client, DEFAULT_LIVE_PAGE_URL)?),
        ]))
    }

    /// Last emitted now-playing value, if any tick has resolved yet
    pub fn current(&self) -> Option<&NowPlaying> {
        self.current.as_ref()
    }

    /// Run one resolution cycle.
    ///
    /// Returns `Some` only when a source produced a value that differs from
    /// the cached one. When every source reports absence or fails, the tick
    /// produces nothing and the cache keeps its last value — transient
    /// flakiness is invisible to the consumer.
    pub async fn resolve(&mut self) -> Option<ChangeEvent> {
        let resolved = self.first_available().await?;

        if self.current.as_ref() == Some(&resolved) {
            debug!(track = %resolved, "Now playing unchanged");
            return None;
        }

        info!(track = %resolved, "Now playing changed");
        let previous = self.current.replace(resolved.clone());
        Some(ChangeEvent {
            previous,
            current: resolved,
        })
    }

    async fn first_available(&mut self) -> Option<NowPlaying> {
        for source in self.sources.iter_mut() {
            match source.attempt().await {
                Ok(Some(now_playing)) => {
                    debug!(source = source.name(), "Source resolved");
                    return Some(now_playing);
                }
                Ok(None) => {
                    debug!(source = source.name(), "Source had no metadata this cycle");
                }
                Err(err) => {
                    warn!(source = source.name(), "Source failed: {err}");
                }
            }
        }
        None
    }
}
