//! ICY in-band metadata support
//!
//! Shoutcast/Icecast servers multiplex track metadata into the audio byte
//! stream when the client asks for it with the `Icy-MetaData: 1` request
//! header. The server then announces a byte interval in the `icy-metaint`
//! response header: after every `metaint` bytes of audio payload comes one
//! length byte, followed by `length * 16` bytes of metadata of the form
//! `StreamTitle='...';StreamUrl='...';` padded with NULs. A zero length byte
//! means the track has not changed since the last block.
//!
//! The interval is negotiated once per connection and never changes for its
//! lifetime. A connection that does not announce `icy-metaint` carries no
//! in-band metadata at all.
//!
//! [`read_metadata_block`] is the pure decoder over any byte reader;
//! [`IcyStreamSource`] owns the HTTP connection and adapts the decoder to
//! the [`NowPlayingSource`] chain, reconnecting after failures.

use crate::error::{Error, Result};
use crate::models::NowPlaying;
use crate::source::NowPlayingSource;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;
use tracing::{debug, info};
use url::Url;

/// Default live stream URL (Studio Brussel "Bruut", high quality)
pub const DEFAULT_STREAM_URL: &str = "http://icecast.vrtcdn.be/stubru_bruut-high.mp3";

/// Request header asking the server to multiplex metadata into the stream
pub const ICY_METADATA_HEADER: &str = "Icy-MetaData";

/// Response header announcing the metadata interval in bytes
pub const ICY_METAINT_HEADER: &str = "icy-metaint";

/// Metadata block length is declared in units of 16 bytes
pub const METADATA_LENGTH_UNIT: usize = 16;

/// Default deadline for one decoding attempt (skip + length byte + block)
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

/// Scratch size for discarding audio payload
const SKIP_CHUNK: usize = 8192;

type IcyBody = StreamReader<BoxStream<'static, std::io::Result<Bytes>>, Bytes>;

/// One open connection to an ICY stream
struct IcyConnection {
    reader: IcyBody,
    /// `None` when the server announced no `icy-metaint` header
    metaint: Option<usize>,
}

/// Read and decode the next in-band metadata block from `reader`.
///
/// Skips exactly `metaint` bytes of audio payload (never inspected), reads
/// the length byte, then reads and parses the metadata block. Returns
/// `Ok(None)` for a zero-length block without consuming anything past the
/// length byte.
///
/// Bytes are consumed irreversibly: on error the reader is mid-frame and
/// must not be reused for another decode.
pub async fn read_metadata_block<R>(reader: &mut R, metaint: usize) -> Result<Option<NowPlaying>>
where
    R: AsyncRead + Unpin,
{
    skip_exact(reader, metaint).await?;

    let length_unit = reader.read_u8().await?;
    if length_unit == 0 {
        return Ok(None);
    }

    let mut block = vec![0u8; length_unit as usize * METADATA_LENGTH_UNIT];
    reader.read_exact(&mut block).await?;

    Ok(Some(parse_metadata_block(&block)))
}

/// Decode a raw metadata block into a [`NowPlaying`].
///
/// Field values sit between `key='` and the first following `';`; the wire
/// format defines no escaping. A missing field yields an empty string.
///
/// The artist field is populated from `StreamUrl`, not from any artist-named
/// field — that is the upstream protocol mapping this crate preserves. Most
/// servers only emit `StreamTitle`, often formatted as `"Artist - Title"`.
pub fn parse_metadata_block(block: &[u8]) -> NowPlaying {
    let text = String::from_utf8_lossy(block);
    let text = text.trim_end_matches('\0');
    NowPlaying {
        title: field_value(text, "StreamTitle").unwrap_or_default(),
        artist: field_value(text, "StreamUrl").unwrap_or_default(),
    }
}

fn field_value(text: &str, key: &str) -> Option<String> {
    let marker = format!("{key}='");
    let start = text.find(&marker)? + marker.len();
    let end = text[start..].find("';")? + start;
    Some(text[start..end].to_string())
}

/// Discard exactly `count` bytes, erroring on premature end of stream.
async fn skip_exact<R>(reader: &mut R, count: usize) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut scratch = [0u8; SKIP_CHUNK];
    let mut remaining = count;
    while remaining > 0 {
        let want = remaining.min(SKIP_CHUNK);
        let read = reader.read(&mut scratch[..want]).await?;
        if read == 0 {
            return Err(Error::Connection(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream ended inside audio payload",
            )));
        }
        remaining -= read;
    }
    Ok(())
}

/// Now-playing source backed by the in-band metadata of the stream itself
///
/// Highest-priority source: it reports what the stream server believes it is
/// sending, ahead of any out-of-band schedule data. The connection is opened
/// lazily on the first attempt and reopened after any failure; a connection
/// that announces no `icy-metaint` marks the source permanently absent so we
/// do not reconnect every tick to a server that will never carry metadata.
pub struct IcyStreamSource {
    client: Client,
    stream_url: String,
    read_timeout: Duration,
    connection: Option<IcyConnection>,
    in_band_unsupported: bool,
}

impl IcyStreamSource {
    /// Create a source for `stream_url`
    ///
    /// The client must not carry a global request timeout: the stream body
    /// stays open across attempts. Per-attempt deadlines are enforced here.
    pub fn new(client: Client, stream_url: impl Into<String>) -> Result<Self> {
        let stream_url = stream_url.into();
        Url::parse(&stream_url)?;
        Ok(Self {
            client,
            stream_url,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            connection: None,
            in_band_unsupported: false,
        })
    }

    /// Override the per-attempt read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Get the stream URL
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    async fn open(&mut self) -> Result<IcyConnection> {
        debug!(url = %self.stream_url, "Opening ICY stream connection");

        let response = self
            .client
            .get(&self.stream_url)
            .header(ICY_METADATA_HEADER, "1")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::api_error(format!(
                "stream endpoint answered {status}"
            )));
        }

        let metaint = response
            .headers()
            .get(ICY_METAINT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<usize>().ok());

        let stream = response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed();

        Ok(IcyConnection {
            reader: StreamReader::new(stream),
            metaint,
        })
    }

    async fn next_block(&mut self) -> Result<Option<NowPlaying>> {
        if self.connection.is_none() {
            let connection = self.open().await?;
            if connection.metaint.is_none() {
                info!(
                    url = %self.stream_url,
                    "Stream announces no icy-metaint, in-band metadata unavailable"
                );
                self.in_band_unsupported = true;
                return Ok(None);
            }
            self.connection = Some(connection);
        }

        let Some(connection) = self.connection.as_mut() else {
            return Ok(None);
        };
        let Some(metaint) = connection.metaint else {
            return Ok(None);
        };

        read_metadata_block(&mut connection.reader, metaint).await
    }
}

#[async_trait]
impl NowPlayingSource for IcyStreamSource {
    fn name(&self) -> &'static str {
        "icy-stream"
    }

    async fn attempt(&mut self) -> Result<Option<NowPlaying>> {
        if self.in_band_unsupported {
            return Ok(None);
        }

        let result = match tokio::time::timeout(self.read_timeout, self.next_block()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        };

        if result.is_err() {
            // Bytes already consumed from this connection cannot be replayed;
            // start clean on the next cycle.
            self.connection = None;
        }

        result
    }
}
