//! Scripted in-memory [`Fetch`] used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use crate::api::client::{classify_body, Fetch, MediaBody};
use crate::error::FetchError;

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with this body (HTML bodies are classified as blocks).
    Body(Vec<u8>),
    /// Non-2xx status.
    Status(u16),
}

impl Reply {
    pub fn json(body: &str) -> Self {
        Reply::Body(body.as_bytes().to_vec())
    }

    pub fn html() -> Self {
        Reply::Body(b"<!DOCTYPE html><html><body>Please wait a few minutes</body></html>".to_vec())
    }
}

#[derive(Debug, Clone)]
struct MediaReply {
    body: Vec<u8>,
    declared_len: Option<u64>,
}

/// Fetcher answering from per-URL scripts and recording every call.
///
/// A URL scripted with several replies answers them in order; the last one
/// repeats.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    pages: Mutex<HashMap<String, VecDeque<Reply>>>,
    media: Mutex<HashMap<String, MediaReply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: impl Into<String>, body: &str) -> Self {
        self.replies(url, vec![Reply::json(body)])
    }

    pub fn replies(self, url: impl Into<String>, replies: Vec<Reply>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.into(), replies.into_iter().collect());
        self
    }

    pub fn media(self, url: impl Into<String>, body: &[u8]) -> Self {
        self.media.lock().unwrap().insert(
            url.into(),
            MediaReply {
                body: body.to_vec(),
                declared_len: Some(body.len() as u64),
            },
        );
        self
    }

    /// Media whose `Content-Length` promises more than the body delivers.
    pub fn truncated_media(self, url: impl Into<String>, body: &[u8], declared_len: u64) -> Self {
        self.media.lock().unwrap().insert(
            url.into(),
            MediaReply {
                body: body.to_vec(),
                declared_len: Some(declared_len),
            },
        );
        self
    }

    /// Every URL requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests whose URL contains `fragment`.
    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains(fragment))
            .count()
    }

    fn record(&self, url: &str) {
        self.calls.lock().unwrap().push(url.to_string());
    }
}

#[async_trait]
impl Fetch for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.record(url);

        let reply = {
            let mut pages = self.pages.lock().unwrap();
            match pages.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Body(body)) => classify_body(200, body),
            Some(Reply::Status(status)) => classify_body(status, Vec::new()),
            None => classify_body(404, b"not scripted".to_vec()),
        }
    }

    async fn open_media(&self, url: &str) -> Result<MediaBody, FetchError> {
        self.record(url);

        let reply = self.media.lock().unwrap().get(url).cloned();
        let Some(reply) = reply else {
            return Err(FetchError::UnexpectedContent {
                status: 404,
                snippet: String::new(),
            });
        };

        let chunks = reply
            .body
            .chunks(4)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect::<Vec<_>>();

        Ok(MediaBody {
            content_length: reply.declared_len,
            chunks: stream::iter(chunks).boxed(),
        })
    }
}
