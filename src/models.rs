//! Data models for now-playing resolution
//!
//! This module contains the resolved track representation, the change event
//! delivered to consumers, and the structures needed to deserialize the
//! broadcaster's schedule API responses.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Title substituted when a source carries no usable title field
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Artist substituted when a source carries no usable artist field
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

// ============================================================================
// Now Playing
// ============================================================================

/// The best-known current track on a live stream
///
/// Both fields may be empty. Two values are equal iff both fields match
/// exactly (case-sensitive, no normalization) — this equality is the sole
/// gate for change notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NowPlaying {
    /// Track title as reported by the winning source
    pub title: String,
    /// Artist as reported by the winning source
    pub artist: String,
}

impl NowPlaying {
    /// Create a new now-playing value
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

impl fmt::Display for NowPlaying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}

/// Emitted when the resolved track differs from the previously known one
///
/// `previous` is `None` for the first successful resolution after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Last value the consumer was told about, if any
    pub previous: Option<NowPlaying>,
    /// Newly resolved value, already stored in the resolver's cache
    pub current: NowPlaying,
}

// ============================================================================
// Schedule API Response Models
// ============================================================================

/// Top-level response from the schedule endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleResponse {
    /// Broadcast schedule entries, in document order
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

impl ScheduleResponse {
    /// First schedule entry currently on air, scanning in document order
    pub fn now_on_air(&self) -> Option<&OnAirItem> {
        self.schedule
            .iter()
            .find_map(|entry| entry.now_on_air_item.as_ref())
    }
}

/// One entry of the broadcast schedule
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Present only on the entry that is on air right now
    pub now_on_air_item: Option<OnAirItem>,
}

/// The item marked as currently on air
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OnAirItem {
    /// Track or show title
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    /// Performing artist
    #[serde(default, deserialize_with = "lenient_string")]
    pub artist: Option<String>,
}

impl OnAirItem {
    /// Title, or [`UNKNOWN_TITLE`] when absent or not a string
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    }

    /// Artist, or [`UNKNOWN_ARTIST`] when absent or not a string
    pub fn artist_or_default(&self) -> &str {
        self.artist.as_deref().unwrap_or(UNKNOWN_ARTIST)
    }
}

/// Accept any JSON value, keeping it only when it is a string.
///
/// The schedule endpoint is not under our control; a wrong-typed field must
/// degrade to the default, not fail the whole body.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_owned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn now_playing_equality_is_exact() {
        let a = NowPlaying::new("Song A", "Artist A");
        assert_eq!(a, NowPlaying::new("Song A", "Artist A"));
        assert_ne!(a, NowPlaying::new("song a", "Artist A"));
        assert_ne!(a, NowPlaying::new("Song A", ""));
    }

    #[test]
    fn now_on_air_picks_first_marked_entry() {
        let response: ScheduleResponse = serde_json::from_value(json!({
            "schedule": [
                { "title": "Earlier show" },
                { "nowOnAirItem": { "title": "Song A", "artist": "Artist A" } },
                { "nowOnAirItem": { "title": "Song B", "artist": "Artist B" } }
            ]
        }))
        .unwrap();

        let item = response.now_on_air().unwrap();
        assert_eq!(item.title_or_default(), "Song A");
        assert_eq!(item.artist_or_default(), "Artist A");
    }

    #[test]
    fn now_on_air_absent_when_nothing_marked() {
        let response: ScheduleResponse = serde_json::from_value(json!({
            "schedule": [{ "title": "a" }, { "title": "b" }]
        }))
        .unwrap();
        assert!(response.now_on_air().is_none());
    }

    #[test]
    fn empty_body_has_no_on_air_entry() {
        let response: ScheduleResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.now_on_air().is_none());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let response: ScheduleResponse = serde_json::from_value(json!({
            "schedule": [{ "nowOnAirItem": { "title": "Song A" } }]
        }))
        .unwrap();

        let item = response.now_on_air().unwrap();
        assert_eq!(item.title_or_default(), "Song A");
        assert_eq!(item.artist_or_default(), UNKNOWN_ARTIST);
    }

    #[test]
    fn wrong_typed_fields_fall_back_to_defaults() {
        let response: ScheduleResponse = serde_json::from_value(json!({
            "schedule": [{ "nowOnAirItem": { "title": 42, "artist": ["x"] } }]
        }))
        .unwrap();

        let item = response.now_on_air().unwrap();
        assert_eq!(item.title_or_default(), UNKNOWN_TITLE);
        assert_eq!(item.artist_or_default(), UNKNOWN_ARTIST);
    }
}
