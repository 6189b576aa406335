//! Error types for now-playing resolution

/// Result type alias for now-playing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving now-playing metadata
///
/// None of these are fatal to the resolution loop: the resolver catches every
/// error at the per-source attempt boundary and treats the source as
/// unavailable for that cycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport-level failure while reading the audio/metadata stream
    #[error("Stream connection failed: {0}")]
    Connection(#[from] std::io::Error),

    /// Endpoint answered with a non-success status
    #[error("API error: {0}")]
    ApiError(String),

    /// Body present but missing the expected structure
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Scraping failed (HTML parsing error)
    #[error("Scraping failed: {0}")]
    ScrapingError(String),

    /// A source attempt exceeded its deadline
    #[error("Request timeout")]
    Timeout,
}

impl Error {
    /// Create an API error
    pub fn api_error(msg: impl Into<String>) -> Self {
        Self::ApiError(msg.into())
    }

    /// Create a malformed-response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a scraping error
    pub fn scraping_error(msg: impl Into<String>) -> Self {
        Self::ScrapingError(msg.into())
    }
}
