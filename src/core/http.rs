//! reqwest-backed [`Transport`] with buffered and line-streamed bodies.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::header;
use tracing::{debug, warn};

use super::error::ChatError;
use super::traits::{LineStream, ResponseMode, Transport, TransportResponse};
use crate::provider::constants::DEFAULT_TIMEOUT;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Overall request timeout, including reading a streamed body.
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP transport posting JSON to a fixed base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(
        base_url: &str,
        config: HttpClientConfig,
        user_agent: Option<&str>,
    ) -> Result<Self, ChatError> {
        let default_ua = format!("gpt-chat/{}", env!("CARGO_PKG_VERSION"));
        let ua = user_agent.unwrap_or(&default_ua);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(ua)
            .build()
            .map_err(|e| {
                ChatError::Configuration(format!("Failed to build reqwest client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[tracing::instrument(
        name = "http_post_json",
        skip(self, body, headers),
        fields(path = %path, mode = ?mode),
        err
    )]
    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        headers: &[(String, String)],
        mode: ResponseMode,
    ) -> Result<TransportResponse, ChatError> {
        let mut req_builder = self.client.post(self.url_for(path)).json(body);

        for (name, value) in headers {
            req_builder = req_builder.header(name, value);
        }
        if mode == ResponseMode::Streamed {
            req_builder = req_builder.header(header::ACCEPT, "text/event-stream");
        }

        let res = req_builder.send().await.map_err(|e| {
            warn!(error = %e, "HTTP request failed");
            ChatError::transport(e.to_string())
        })?;

        let status = res.status();
        if !status.is_success() {
            warn!(status = %status, "API returned error status");

            let error_text = res.text().await.unwrap_or_default();
            let message = if error_text.is_empty() {
                format!("API returned status {status}")
            } else {
                error_text.clone()
            };

            return Err(ChatError::Transport {
                message,
                status_code: Some(status.as_u16()),
                body: Some(error_text).filter(|b| !b.is_empty()),
            });
        }

        debug!(status = %status, "HTTP request successful");

        match mode {
            ResponseMode::Buffered => {
                let text = res.text().await.map_err(|e| {
                    ChatError::transport(format!("Failed to read response body: {e}"))
                })?;
                Ok(TransportResponse::Buffered(text))
            }
            ResponseMode::Streamed => Ok(TransportResponse::Lines(lines_from_chunks(
                res.bytes_stream(),
            ))),
        }
    }
}

/// Splits a byte stream into lines.
///
/// Splitting happens on raw bytes so a multi-byte character cut by a chunk
/// boundary is decoded whole. Trailing `\r` is dropped.
#[derive(Debug, Default)]
pub(crate) struct LineDecoder {
    buf: BytesMut,
    /// Bytes of `buf` already known to hold no newline.
    scanned: usize,
}

impl LineDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub(crate) fn next_line(&mut self) -> Option<String> {
        let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') else {
            self.scanned = self.buf.len();
            return None;
        };
        let eol_idx = self.scanned + offset;
        self.scanned = 0;
        let line = self.buf.split_to(eol_idx + 1);
        Some(decode_line(&line[..eol_idx]))
    }

    /// Flush an unterminated last line.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        self.scanned = 0;
        let rest = self.buf.split();
        Some(decode_line(&rest))
    }

    fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

struct LineReader<S> {
    chunks: S,
    decoder: LineDecoder,
    exhausted: bool,
}

/// Turn a chunk stream into a lazily read [`LineStream`].
///
/// A read error is yielded once and ends the stream.
pub(crate) fn lines_from_chunks<S, E>(chunks: S) -> LineStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let reader = LineReader {
        chunks: Box::pin(chunks),
        decoder: LineDecoder::default(),
        exhausted: false,
    };

    futures::stream::unfold(reader, |mut reader| async move {
        loop {
            if let Some(line) = reader.decoder.next_line() {
                return Some((Ok(line), reader));
            }
            if reader.exhausted {
                return reader.decoder.finish().map(|line| (Ok(line), reader));
            }

            match reader.chunks.next().await {
                Some(Ok(bytes)) => reader.decoder.push(&bytes),
                Some(Err(e)) => {
                    warn!(error = %e, "Response stream failed");
                    reader.exhausted = true;
                    reader.decoder.clear();
                    let err = ChatError::transport(format!("Failed to read response body: {e}"));
                    return Some((Err(err), reader));
                }
                None => reader.exhausted = true,
            }
        }
    })
    .boxed()
}
