//! HTTP client for the chat, search, and report endpoints
//!
//! The chat endpoint answers a POST with a plain-text body that is
//! streamed as it is generated. [`HttpChatClient::open_stream`] turns
//! that body into a stream of decoded text increments; multi-byte UTF-8
//! sequences split across network chunks are reassembled before they
//! are handed out.

use crate::config::ServerConfig;
use crate::error::{Result, TablechatError};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

/// Stream of decoded text increments from a chat reply
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Body of a chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message
    pub message: String,
    /// Active session identifier, `null` when none is active
    pub session_id: Option<String>,
    /// Ask the server to ground the answer in a web search
    pub use_search: bool,
}

/// Source of streamed chat replies
///
/// The streaming renderer only needs this one operation, which keeps it
/// testable without a server.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Issue the request and return the reply body as a text stream
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the server
    /// answers with a non-success status. Errors after the body started
    /// arriving are yielded as stream items instead.
    async fn open_stream(&self, request: &ChatRequest) -> Result<TextStream>;
}

/// One normalized search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Result title
    pub title: String,
    /// Link to the result
    pub url: String,
    /// Short description
    pub snippet: String,
}

/// Search hit as returned by the server; field names vary by engine
#[derive(Debug, Default, Deserialize)]
struct RawSearchItem {
    title: Option<String>,
    body: Option<String>,
    href: Option<String>,
    url: Option<String>,
    description: Option<String>,
}

impl From<RawSearchItem> for SearchResult {
    fn from(raw: RawSearchItem) -> Self {
        let (title, snippet) = match raw.title {
            Some(title) => (title, raw.body.or(raw.description)),
            None => (raw.body.unwrap_or_default(), raw.description),
        };
        Self {
            title,
            url: raw.href.or(raw.url).unwrap_or_default(),
            snippet: snippet.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

/// Downloaded report document
#[derive(Debug, Clone)]
pub struct Report {
    /// File name suggested by the server (or a dated default)
    pub filename: String,
    /// Raw document bytes
    pub bytes: Bytes,
}

/// reqwest-backed client for all server endpoints
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    http: reqwest::Client,
    base_url: String,
    chat_path: String,
    search_path: String,
    report_path: String,
}

impl HttpChatClient {
    /// Build a client from the server configuration
    ///
    /// No network I/O happens here.
    ///
    /// # Errors
    ///
    /// Returns `TablechatError::Config` if the HTTP client cannot be built
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|e| TablechatError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_path: config.chat_path.clone(),
            search_path: config.search_path.clone(),
            report_path: config.report_path.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Query the search endpoint
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, or a
    /// body that is not a JSON array of objects
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let url = self.endpoint(&self.search_path);
        tracing::debug!(%url, query, max_results, "Sending search request");

        let response = self
            .http
            .post(&url)
            .json(&SearchRequest { query, max_results })
            .send()
            .await
            .map_err(|e| TablechatError::Transport(format!("Search request failed: {}", e)))?;

        check_status(&response)?;

        let items: Vec<RawSearchItem> = response
            .json()
            .await
            .map_err(|e| TablechatError::Decode(format!("Invalid search response: {}", e)))?;

        Ok(items.into_iter().map(SearchResult::from).collect())
    }

    /// Ask the server to generate the report document and download it
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-success status
    pub async fn download_report(&self) -> Result<Report> {
        let url = self.endpoint(&self.report_path);
        tracing::debug!(%url, "Requesting report");

        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| TablechatError::Transport(format!("Report request failed: {}", e)))?;

        check_status(&response)?;

        let filename = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(default_report_filename);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TablechatError::Transport(format!("Report download failed: {}", e)))?;

        tracing::info!(filename = %filename, size = bytes.len(), "Downloaded report");
        Ok(Report { filename, bytes })
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpChatClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<TextStream> {
        let url = self.endpoint(&self.chat_path);
        tracing::debug!(%url, session_id = ?request.session_id, use_search = request.use_search, "Sending chat request");

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| TablechatError::Transport(format!("Chat request failed: {}", e)))?;

        check_status(&response)?;

        Ok(decode_text_stream(response.bytes_stream()))
    }
}

fn check_status(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        return Err(TablechatError::HttpStatus {
            status: status.as_u16(),
        }
        .into());
    }
    Ok(())
}

/// Turn a raw byte stream into a stream of UTF-8 text increments
///
/// Empty increments (chunks that only carried part of a character) are
/// skipped. Invalid bytes become U+FFFD. A byte-level error ends the
/// stream after being yielded once.
pub fn decode_text_stream<S, E>(bytes: S) -> TextStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = (Box::pin(bytes), Utf8ChunkDecoder::default(), false);

    Box::pin(futures::stream::unfold(
        state,
        |(mut inner, mut decoder, done)| async move {
            if done {
                return None;
            }
            loop {
                match inner.next().await {
                    Some(Ok(chunk)) => {
                        let text = decoder.push(&chunk);
                        if !text.is_empty() {
                            return Some((Ok(text), (inner, decoder, false)));
                        }
                    }
                    Some(Err(e)) => {
                        let err = TablechatError::Transport(format!("Stream interrupted: {}", e));
                        return Some((Err(err.into()), (inner, decoder, true)));
                    }
                    None => {
                        let tail = decoder.finish();
                        if tail.is_empty() {
                            return None;
                        }
                        return Some((Ok(tail), (inner, decoder, true)));
                    }
                }
            }
        },
    ))
}

/// Incremental UTF-8 decoder that holds back incomplete trailing bytes
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Feed a chunk and return all text that is now complete
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            // incomplete sequence at the end, wait for more bytes
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of stream; leftover bytes become one U+FFFD
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// Extract a safe file name from a `Content-Disposition` header value
///
/// Only the final path component is kept so a hostile header cannot
/// direct the write outside the target directory.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let raw = header.split(';').map(str::trim).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("filename") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })?;

    let name = Path::new(raw).file_name()?.to_str()?.to_string();
    if name.is_empty() || name == ".." {
        None
    } else {
        Some(name)
    }
}

/// Dated fallback name for a report without `Content-Disposition`
pub fn default_report_filename() -> String {
    format!("report_{}.pptx", chrono::Local::now().format("%Y%m%d"))
}

/// Write a downloaded report into `dir`, creating it if needed
///
/// # Errors
///
/// Returns an IO error if the directory or file cannot be written
pub async fn save_report(report: &Report, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&report.filename);
    tokio::fs::write(&path, &report.bytes).await?;
    Ok(path)
}
