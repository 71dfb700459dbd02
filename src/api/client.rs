//! HTTP page fetcher with browser-like headers.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{header, Client};
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

use crate::error::{Error, FetchError, Result};

/// Public web origin of the API.
const API_BASE: &str = "https://www.instagram.com";

/// Query ID of the timeline continuation query.
const TIMELINE_QUERY_ID: &str = "17888483320059182";

/// Entries requested per continuation page.
const PAGE_SIZE: u32 = 100;

/// The API gates on looking like a browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US";

/// Bytes of an unexpected body kept for diagnostics.
const SNIPPET_LEN: usize = 120;

/// Streamed media response.
pub struct MediaBody {
    pub content_length: Option<u64>,
    pub chunks: BoxStream<'static, std::result::Result<Bytes, FetchError>>,
}

/// Network access used by the crawler and the download workers.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET a JSON endpoint and return the raw body.
    ///
    /// HTML bodies and non-2xx statuses are [`FetchError::UnexpectedContent`].
    /// No retries happen here.
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;

    /// GET a media file as a byte stream.
    async fn open_media(&self, url: &str) -> std::result::Result<MediaBody, FetchError>;
}

/// URLs of the three fixed endpoints.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::with_base(API_BASE)
    }
}

impl Endpoints {
    /// Endpoints rooted at another origin (used against local mock servers).
    pub fn with_base(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Root page of an account, keyed by username.
    pub fn root_page(&self, username: &str) -> String {
        format!("{}/{}/?__a=1", self.base, username)
    }

    /// Continuation page keyed by numeric account ID and cursor.
    pub fn next_page(&self, account_id: &str, cursor: &str) -> String {
        let cursor: String = form_urlencoded::byte_serialize(cursor.as_bytes()).collect();
        format!(
            "{}/graphql/query/?query_id={}&id={}&first={}&after={}",
            self.base, TIMELINE_QUERY_ID, account_id, PAGE_SIZE, cursor
        )
    }

    /// Single post detail keyed by shortcode.
    pub fn post(&self, shortcode: &str) -> String {
        format!("{}/p/{}/?__a=1", self.base, shortcode)
    }
}

/// reqwest-backed [`Fetch`] implementation.
///
/// Media bodies can take far longer than `timeout` to stream, so the client
/// only bounds connecting and the gap between reads. JSON pages are small
/// and additionally get `timeout` as a whole-request deadline.
pub struct HttpFetcher {
    client: Client,
    page_timeout: Duration,
    cancel: CancellationToken,
}

impl HttpFetcher {
    /// Build the client. All requests abort when `cancel` fires.
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static(ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            page_timeout: timeout,
            cancel,
        })
    }

    async fn get(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> std::result::Result<reqwest::Response, FetchError> {
        tracing::debug!("GET {}", url);

        tokio::select! {
            response = request.send() => Ok(response?),
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
        }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let request = self.client.get(url).timeout(self.page_timeout);
        let response = self.get(request, url).await?;
        let status = response.status().as_u16();
        tracing::debug!("Response status: {}", status);

        let body = tokio::select! {
            body = response.bytes() => body?,
            _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
        };

        classify_body(status, body.to_vec())
    }

    async fn open_media(&self, url: &str) -> std::result::Result<MediaBody, FetchError> {
        let response = self.get(self.client.get(url), url).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::UnexpectedContent {
                status: status.as_u16(),
                snippet: String::new(),
            });
        }

        let content_length = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(FetchError::from))
            .boxed();

        Ok(MediaBody {
            content_length,
            chunks,
        })
    }
}

/// Classify a JSON endpoint response.
///
/// The service answers suspected automation and rate limiting with an HTML
/// page, so a body starting with `<` (after leading whitespace) is treated
/// the same as a non-2xx status.
pub fn classify_body(status: u16, body: Vec<u8>) -> std::result::Result<Vec<u8>, FetchError> {
    let first = body.iter().find(|b| !b.is_ascii_whitespace()).copied();

    if !(200..300).contains(&status) || first == Some(b'<') {
        let snippet = String::from_utf8_lossy(&body[..body.len().min(SNIPPET_LEN)]).into_owned();
        return Err(FetchError::UnexpectedContent { status, snippet });
    }

    if first.is_none() {
        return Err(FetchError::Empty);
    }

    Ok(body)
}
