//! Streaming API client
//!
//! The filter endpoint keeps a single HTTP response open and writes one JSON
//! message per `\r\n`-terminated line. Blank lines are keep-alives, sent
//! roughly every 30 seconds; if nothing at all arrives for
//! [`IDLE_TIMEOUT`] the connection is considered stalled and the
//! subscription ends with an error.

use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::AUTHORIZATION;

use super::{map_http_error, map_transport_error, oauth, USER_AGENT};
use crate::config::Credentials;
use crate::error::{PlatformError, ReshareError, Result, StreamError};
use crate::platforms::{EventStream, StreamClient};
use crate::types::StreamEvent;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Three missed keep-alives
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Longest message accepted; a longer unterminated line ends the stream
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

pub struct TwitterStreamClient {
    http: reqwest::Client,
    credentials: Arc<Credentials>,
    stream_base: String,
    idle_timeout: Duration,
}

impl TwitterStreamClient {
    /// Create a client for the streaming API rooted at `stream_base`
    /// (e.g. "https://stream.twitter.com")
    pub fn new(credentials: Arc<Credentials>, stream_base: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            credentials,
            stream_base: stream_base.trim_end_matches('/').to_string(),
            idle_timeout: IDLE_TIMEOUT,
        })
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn filter_url(&self) -> String {
        format!("{}/1.1/statuses/filter.json", self.stream_base)
    }
}

#[async_trait]
impl StreamClient for TwitterStreamClient {
    async fn subscribe(&self, track: &[String]) -> Result<EventStream> {
        let url = self.filter_url();
        let track = track.join(",");
        let params = [("track", track.as_str())];
        let auth = oauth::authorization_header(&self.credentials, "POST", &url, &params)?;

        // Response headers fall under the idle timeout as well
        let request = self
            .http
            .post(&url)
            .header(AUTHORIZATION, auth)
            .form(&params)
            .send();
        let response = tokio::time::timeout(self.idle_timeout, request)
            .await
            .map_err(|_| {
                StreamError::Network(format!(
                    "no response to subscribe within {:?}",
                    self.idle_timeout
                ))
            })?
            .map_err(|e| map_transport_error(e, "subscribe"))?;

        if !response.status().is_success() {
            return Err(map_http_error(response, "subscribe").await.into());
        }

        tracing::debug!("Connected to {} (track={})", url, track);

        Ok(Box::pin(decode_lines(
            response.bytes_stream(),
            self.idle_timeout,
        )))
    }

    fn name(&self) -> &str {
        "twitter"
    }
}

struct LineReader<S> {
    inner: Pin<Box<S>>,
    lines: LineBuffer,
    idle_timeout: Duration,
    finished: bool,
}

/// Bytes received but not yet split into lines
///
/// `scanned` marks how far the buffer is known to hold no newline, so each
/// chunk is searched once.
#[derive(Debug, Default)]
struct LineBuffer {
    buffer: Vec<u8>,
    scanned: usize,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Remove the first complete line, without its terminator
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            return None;
        };
        let newline = self.scanned + offset;
        self.scanned = 0;

        let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Everything left, terminated or not
    fn take_rest(&mut self) -> Vec<u8> {
        self.scanned = 0;
        std::mem::take(&mut self.buffer)
    }

    fn clear(&mut self) {
        self.scanned = 0;
        self.buffer.clear();
    }
}

/// Turn a raw chunked body into stream events
///
/// Chunk boundaries do not align with lines, so bytes are buffered until a
/// newline arrives. A transport error, an idle timeout or a line longer
/// than [`MAX_LINE_BYTES`] yields one `Err` and ends the stream. Lines that are not valid JSON are logged and
/// surfaced as [`StreamEvent::Other`].
pub fn decode_lines<S, E>(
    bytes: S,
    idle_timeout: Duration,
) -> impl Stream<Item = Result<StreamEvent>> + Send + 'static
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let reader = LineReader {
        inner: Box::pin(bytes),
        lines: LineBuffer::default(),
        idle_timeout,
        finished: false,
    };

    futures::stream::unfold(reader, |mut reader| async move {
        loop {
            if let Some(line) = reader.lines.take_line() {
                if let Some(event) = parse_line(&line) {
                    return Some((Ok(event), reader));
                }
                continue;
            }

            if reader.finished {
                // Flush a final unterminated line, then stop
                let rest = reader.lines.take_rest();
                return parse_line(&rest).map(|event| (Ok(event), reader));
            }

            if reader.lines.len() > MAX_LINE_BYTES {
                reader.finished = true;
                reader.lines.clear();
                let error = StreamError::Decode(format!(
                    "message exceeds {} bytes without a line break",
                    MAX_LINE_BYTES
                ));
                return Some((Err(ReshareError::from(error)), reader));
            }

            match tokio::time::timeout(reader.idle_timeout, reader.inner.next()).await {
                Ok(Some(Ok(chunk))) => reader.lines.push(&chunk),
                Ok(Some(Err(e))) => {
                    reader.finished = true;
                    reader.lines.clear();
                    let error = StreamError::Network(e.to_string());
                    return Some((Err(ReshareError::from(error)), reader));
                }
                Ok(None) => reader.finished = true,
                Err(_) => {
                    reader.finished = true;
                    reader.lines.clear();
                    let error = StreamError::Network(format!(
                        "no data received for {}s",
                        reader.idle_timeout.as_secs()
                    ));
                    return Some((Err(ReshareError::from(error)), reader));
                }
            }
        }
    })
}

/// Keep-alive (blank) lines yield `None`
fn parse_line(line: &[u8]) -> Option<StreamEvent> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match StreamEvent::from_json(text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("Skipping unreadable stream message: {}", e);
            Some(StreamEvent::Other)
        }
    }
}
