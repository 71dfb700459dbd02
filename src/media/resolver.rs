//! Resolution of feed entries into concrete download items.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::api::{parse_post, Endpoints, Fetch, PostDetail};
use crate::download::gate::RateLimitGate;
use crate::error::{ParseError, ResolveError};
use crate::media::item::{DownloadItem, EntryMeta, FeedEntry, MediaKind};

/// Turns one feed entry into zero or more download items, issuing a
/// follow-up post fetch for videos and carousels.
pub struct MediaResolver {
    fetcher: Arc<dyn Fetch>,
    endpoints: Arc<Endpoints>,
    gate: Arc<RateLimitGate>,
}

impl MediaResolver {
    pub fn new(fetcher: Arc<dyn Fetch>, endpoints: Arc<Endpoints>, gate: Arc<RateLimitGate>) -> Self {
        Self {
            fetcher,
            endpoints,
            gate,
        }
    }

    /// Resolve `entry` for `account`.
    ///
    /// Images need no network access. Unknown entry kinds resolve to nothing
    /// and are only logged.
    pub async fn resolve(
        &self,
        entry: &FeedEntry,
        account: &str,
    ) -> Result<Vec<DownloadItem>, ResolveError> {
        let items = match entry {
            FeedEntry::Image { meta, url } => {
                let url = url
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| ResolveError::Parse {
                        shortcode: meta.shortcode.clone(),
                        source: ParseError::MissingField("display_url"),
                    })?;
                let created = created_at(meta, meta.taken_at);
                vec![make_item(account, url, created, meta, MediaKind::Image)]
            }
            FeedEntry::Video { meta, .. } => {
                let post = self.fetch_post(&meta.shortcode).await?;
                let url = post.video_url.as_deref().ok_or_else(|| ResolveError::Parse {
                    shortcode: meta.shortcode.clone(),
                    source: ParseError::MissingField("graphql.shortcode_media.video_url"),
                })?;
                let created = created_at(meta, post.taken_at.or(meta.taken_at));
                vec![make_item(account, url, created, meta, MediaKind::Video)]
            }
            FeedEntry::Carousel { meta } => {
                let post = self.fetch_post(&meta.shortcode).await?;
                self.carousel_items(account, meta, &post)
            }
            FeedEntry::Unknown { meta, typename } => {
                tracing::warn!(
                    account,
                    shortcode = %meta.shortcode,
                    "Unknown media type '{}', skipping",
                    typename
                );
                Vec::new()
            }
        };

        tracing::debug!(
            account,
            shortcode = %entry.shortcode(),
            "Resolved {} item(s) from {}",
            items.len(),
            entry.kind_name()
        );

        Ok(items)
    }

    /// Children share the carousel's timestamp; the API has none per child.
    fn carousel_items(&self, account: &str, meta: &EntryMeta, post: &PostDetail) -> Vec<DownloadItem> {
        let created = created_at(meta, post.taken_at.or(meta.taken_at));
        let mut items = Vec::with_capacity(post.children.len());

        for child in &post.children {
            let Some(kind) = child.kind else {
                tracing::warn!(
                    account,
                    shortcode = %meta.shortcode,
                    "Unknown sidecar type '{}', skipping child",
                    child.typename
                );
                continue;
            };

            match child.url.as_deref() {
                Some(url) => items.push(make_item(account, url, created, meta, kind)),
                None => tracing::warn!(
                    account,
                    shortcode = %meta.shortcode,
                    child = child.shortcode.as_deref().unwrap_or("?"),
                    "Sidecar child has no media URL, skipping"
                ),
            }
        }

        if post.children.is_empty() {
            tracing::debug!(shortcode = %meta.shortcode, "Carousel has no children");
        }

        items
    }

    async fn fetch_post(&self, shortcode: &str) -> Result<PostDetail, ResolveError> {
        if shortcode.is_empty() {
            return Err(ResolveError::Parse {
                shortcode: String::new(),
                source: ParseError::MissingField("shortcode"),
            });
        }

        self.gate
            .wait()
            .await
            .map_err(|source| ResolveError::SubFetchFailed {
                shortcode: shortcode.to_string(),
                source,
            })?;

        let body = match self.fetcher.fetch(&self.endpoints.post(shortcode)).await {
            Ok(body) => body,
            Err(e) if e.is_block() => {
                self.gate.trip();
                return Err(ResolveError::RateLimited {
                    shortcode: shortcode.to_string(),
                });
            }
            Err(source) => {
                return Err(ResolveError::SubFetchFailed {
                    shortcode: shortcode.to_string(),
                    source,
                })
            }
        };

        parse_post(&body).map_err(|source| ResolveError::Parse {
            shortcode: shortcode.to_string(),
            source,
        })
    }
}

fn make_item(
    account: &str,
    url: &str,
    created: DateTime<Utc>,
    meta: &EntryMeta,
    kind: MediaKind,
) -> DownloadItem {
    DownloadItem {
        account: account.to_string(),
        url: url.to_string(),
        created,
        shortcode: meta.shortcode.clone(),
        kind,
    }
}

/// Missing timestamps fall back to the unix epoch so the item still lands.
fn created_at(meta: &EntryMeta, taken_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    taken_at.unwrap_or_else(|| {
        tracing::warn!(shortcode = %meta.shortcode, "Post has no timestamp, dating it 1970-01-01");
        DateTime::<Utc>::default()
    })
}
