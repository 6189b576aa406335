//! Source capability shared by all metadata providers

use crate::error::Result;
use crate::models::NowPlaying;
use async_trait::async_trait;

/// A single provider of now-playing metadata
///
/// Implementations are consulted by the resolver in fixed priority order:
///
/// - `Ok(Some(_))` is a usable result and wins the cycle — an empty-string
///   pair still counts, the source completed without error;
/// - `Ok(None)` means the source completed but carries nothing this cycle
///   (e.g. a zero-length in-band block, or no entry marked on air);
/// - `Err(_)` means the source failed.
///
/// The resolver treats the last two identically: log and move on to the next
/// source. No error crosses the resolver boundary.
#[async_trait]
pub trait NowPlayingSource: Send {
    /// Short stable identifier used in logs
    fn name(&self) -> &'static str;

    /// Attempt one resolution cycle against this source
    async fn attempt(&mut self) -> Result<Option<NowPlaying>>;
}
