//! Livestream page scraper
//!
//! Last-resort source: fetch the public livestream page and read the track
//! title out of its markup with two CSS selectors. Markup is the least
//! stable of the three sources, hence its place at the end of the chain.

use crate::error::{Error, Result};
use crate::models::{NowPlaying, UNKNOWN_ARTIST, UNKNOWN_TITLE};
use crate::source::NowPlayingSource;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default livestream page URL (Studio Brussel "Zware Gitaren")
pub const DEFAULT_LIVE_PAGE_URL: &str =
    "https://www.vrt.be/vrtmax/livestream/audio/studio-brussel-zware-gitaren";

/// Default selector for the main (track title) element
pub const DEFAULT_TITLE_SELECTOR: &str = "span.main-title";

/// Default selector for the sub (artist) element
pub const DEFAULT_ARTIST_SELECTOR: &str = "span.sub-title";

/// Default timeout for one page request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Now-playing source backed by the livestream page markup
#[derive(Debug)]
pub struct LivePageSource {
    client: Client,
    page_url: String,
    title_selector: Selector,
    artist_selector: Selector,
    request_timeout: Duration,
}

impl LivePageSource {
    /// Create a source scraping `page_url` with the default selectors
    pub fn new(client: Client, page_url: impl Into<String>) -> Result<Self> {
        Self::with_selectors(
            client,
            page_url,
            DEFAULT_TITLE_SELECTOR,
            DEFAULT_ARTIST_SELECTOR,
        )
    }

    /// Create a source with custom title/artist selectors
    pub fn with_selectors(
        client: Client,
        page_url: impl Into<String>,
        title_selector: &str,
        artist_selector: &str,
    ) -> Result<Self> {
        let page_url = page_url.into();
        Url::parse(&page_url)?;
        Ok(Self {
            client,
            page_url,
            title_selector: parse_selector(title_selector)?,
            artist_selector: parse_selector(artist_selector)?,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    /// Override the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Get the page URL
    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Extract a now-playing pair from the page markup.
    ///
    /// A missing node substitutes the unknown-title/unknown-artist default
    /// rather than failing; an empty node still counts as present.
    fn extract(&self, html: &str) -> NowPlaying {
        let document = Html::parse_document(html);
        let title = selected_text(&document, &self.title_selector)
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let artist = selected_text(&document, &self.artist_selector)
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        NowPlaying { title, artist }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|err| Error::scraping_error(format!("invalid selector {selector:?}: {err:?}")))
}

fn selected_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

#[async_trait]
impl NowPlayingSource for LivePageSource {
    fn name(&self) -> &'static str {
        "live-page"
    }

    async fn attempt(&mut self) -> Result<Option<NowPlaying>> {
        debug!(url = %self.page_url, "Fetching livestream page");

        let response = self
            .client
            .get(&self.page_url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::api_error(format!("livestream page answered {status}")));
        }

        let html = response.text().await?;
        // No await past this point: the parsed document never crosses one
        Ok(Some(self.extract(&html)))
    }
}
