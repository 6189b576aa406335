//! JSON schedule poller
//!
//! Queries the broadcaster's public schedule endpoint and picks the entry
//! currently marked on air. First fallback when the stream carries no usable
//! in-band metadata.

use crate::error::{Error, Result};
use crate::models::{NowPlaying, ScheduleResponse};
use crate::source::NowPlayingSource;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default schedule endpoint (Studio Brussel "Bruut" livestream channel)
pub const DEFAULT_SCHEDULE_URL: &str = "https://media-services-public.vrt.be/vualto-video-aggregator-web/rest/external/v2/channels/livestream-audio-stubrubruut";

/// Default timeout for one schedule request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Now-playing source backed by the schedule API
pub struct ScheduleSource {
    client: Client,
    endpoint: String,
    request_timeout: Duration,
}

impl ScheduleSource {
    /// Create a source polling `endpoint`
    pub fn new(client: Client, endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;
        Ok(Self {
            client,
            endpoint,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    /// Override the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Get the schedule endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self) -> Result<ScheduleResponse> {
        debug!(url = %self.endpoint, "Fetching schedule");

        let response = self
            .client
            .get(&self.endpoint)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::api_error(format!(
                "schedule endpoint answered {status}"
            )));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl NowPlayingSource for ScheduleSource {
    fn name(&self) -> &'static str {
        "schedule-api"
    }

    async fn attempt(&mut self) -> Result<Option<NowPlaying>> {
        let schedule = self.fetch().await?;
        Ok(schedule.now_on_air().map(|item| {
            NowPlaying::new(item.title_or_default(), item.artist_or_default())
        }))
    }
}
