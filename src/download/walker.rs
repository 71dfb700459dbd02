//! Cursor-following walk over one account's media timeline.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::api::{parse_next_page, parse_root_page, Endpoints, FeedPage, Fetch};
use crate::download::gate::RateLimitGate;
use crate::download::state::{RunStats, WalkSummary};
use crate::error::{FetchError, ResolveError, WalkError};
use crate::media::{DownloadItem, MediaResolver};

/// Behaviour switches for a walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Stop after the root page.
    pub latest_only: bool,
    /// Entries on one page resolved concurrently.
    pub resolve_concurrency: usize,
    /// Jittered pause between page fetches, in milliseconds (min, max).
    pub page_delay_ms: (u64, u64),
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            latest_only: false,
            resolve_concurrency: 4,
            page_delay_ms: (0, 0),
        }
    }
}

/// Walks an account's feed page by page, resolving every entry and pushing
/// the resulting items onto the shared download queue.
pub struct PaginationWalker {
    fetcher: Arc<dyn Fetch>,
    endpoints: Arc<Endpoints>,
    resolver: MediaResolver,
    gate: Arc<RateLimitGate>,
    stats: Arc<RunStats>,
    options: WalkOptions,
    cancel: CancellationToken,
}

impl PaginationWalker {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        endpoints: Arc<Endpoints>,
        gate: Arc<RateLimitGate>,
        stats: Arc<RunStats>,
        options: WalkOptions,
        cancel: CancellationToken,
    ) -> Self {
        let resolver = MediaResolver::new(fetcher.clone(), endpoints.clone(), gate.clone());

        Self {
            fetcher,
            endpoints,
            resolver,
            gate,
            stats,
            options,
            cancel,
        }
    }

    /// Walk `username`'s feed until the last page, or only the root page in
    /// latest-only mode.
    ///
    /// Page fetch or parse failures abort this account. Entry-level failures
    /// are logged and the entry dropped.
    pub async fn walk(
        &self,
        username: &str,
        items: &mpsc::Sender<DownloadItem>,
    ) -> Result<WalkSummary, WalkError> {
        let mut summary = WalkSummary {
            account: username.to_string(),
            ..Default::default()
        };

        let body = self
            .fetch_page(username, &self.endpoints.root_page(username))
            .await?;
        let (account, mut page) = parse_root_page(&body).map_err(|source| WalkError::Parse {
            account: username.to_string(),
            source,
        })?;

        tracing::info!(
            account = username,
            id = %account.id,
            full_name = account.full_name.as_deref().unwrap_or(""),
            followers = account.followers.unwrap_or_default(),
            following = account.following.unwrap_or_default(),
            "Crawling account"
        );

        let mut seen_cursors = HashSet::new();

        loop {
            summary.pages += 1;
            tracing::debug!(
                account = username,
                page = summary.pages,
                entries = page.entries.len(),
                has_more = page.has_more,
                "Fetched page"
            );

            self.enqueue_page(username, &page, items, &mut summary).await?;

            if self.options.latest_only {
                tracing::debug!(account = username, "Latest-only mode, not following cursor");
                break;
            }

            let Some(cursor) = page.next_cursor() else {
                break;
            };

            if !seen_cursors.insert(cursor.to_string()) {
                tracing::warn!(account = username, cursor, "Cursor repeated, ending walk");
                break;
            }

            if page.entries.is_empty() {
                tracing::debug!(account = username, "Empty page mid-stream, continuing");
            }

            let url = self.endpoints.next_page(&account.id, cursor);
            self.pause_between_pages().await?;

            let body = self.fetch_page(username, &url).await?;
            page = parse_next_page(&body).map_err(|source| WalkError::Parse {
                account: username.to_string(),
                source,
            })?;
        }

        tracing::info!(
            account = username,
            "Walked {} page(s), queued {} item(s)",
            summary.pages,
            summary.items_queued
        );

        Ok(summary)
    }

    /// Resolve every entry on `page` and enqueue the items in page order.
    async fn enqueue_page(
        &self,
        account: &str,
        page: &FeedPage,
        items: &mpsc::Sender<DownloadItem>,
        summary: &mut WalkSummary,
    ) -> Result<(), WalkError> {
        let mut resolved = stream::iter(page.entries.iter().cloned())
            .map(|entry| async move {
                let result = self.resolver.resolve(&entry, account).await;
                (entry, result)
            })
            .buffered(self.options.resolve_concurrency.max(1));

        while let Some((entry, result)) = resolved.next().await {
            summary.entries += 1;

            match result {
                Ok(resolved_items) => {
                    for item in resolved_items {
                        self.push(items, item).await?;
                        summary.items_queued += 1;
                    }
                }
                Err(ResolveError::RateLimited { shortcode }) => {
                    summary.entries_dropped += 1;
                    self.stats.record_lost_to_rate_limit();
                    tracing::warn!(account, shortcode = %shortcode, "Item lost to rate limiting");
                }
                Err(ResolveError::SubFetchFailed {
                    source: FetchError::Cancelled,
                    ..
                }) => return Err(WalkError::Cancelled),
                Err(e) => {
                    summary.entries_dropped += 1;
                    self.stats.record_dropped();
                    tracing::warn!(
                        account,
                        shortcode = %entry.shortcode(),
                        "Dropping {}: {}",
                        entry.kind_name(),
                        e
                    );
                }
            }
        }

        Ok(())
    }

    async fn push(
        &self,
        items: &mpsc::Sender<DownloadItem>,
        item: DownloadItem,
    ) -> Result<(), WalkError> {
        tokio::select! {
            sent = items.send(item) => sent.map_err(|_| WalkError::QueueClosed),
            _ = self.cancel.cancelled() => Err(WalkError::Cancelled),
        }
    }

    /// Fetch a page, retrying once after a crawl-wide cooldown if the
    /// response looks like a block.
    async fn fetch_page(&self, account: &str, url: &str) -> Result<Vec<u8>, WalkError> {
        let mut retried = false;

        loop {
            self.gate.wait().await.map_err(|_| WalkError::Cancelled)?;

            match self.fetcher.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_block() && !retried => {
                    retried = true;
                    self.gate.trip();
                    tracing::warn!(account, "Page fetch blocked, retrying after cooldown: {}", e);
                }
                Err(e) if e.is_block() => {
                    self.gate.trip();
                    return Err(WalkError::RateLimited(account.to_string()));
                }
                Err(FetchError::Cancelled) => return Err(WalkError::Cancelled),
                Err(source) => {
                    return Err(WalkError::Fetch {
                        account: account.to_string(),
                        source,
                    })
                }
            }
        }
    }

    async fn pause_between_pages(&self) -> Result<(), WalkError> {
        let (min, max) = self.options.page_delay_ms;
        if max == 0 {
            return Ok(());
        }

        let delay_ms = rand::thread_rng().gen_range(min..=max);
        tokio::select! {
            _ = sleep(Duration::from_millis(delay_ms)) => Ok(()),
            _ = self.cancel.cancelled() => Err(WalkError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    use crate::api::testing::{Reply, ScriptedFetcher};
    use crate::error::ParseError;

    const BASE: &str = "http://api.test";

    fn image_edge(shortcode: &str, url: &str, ts: i64) -> Value {
        json!({"node": {
            "__typename": "GraphImage",
            "shortcode": shortcode,
            "display_url": url,
            "taken_at_timestamp": ts
        }})
    }

    fn timeline(edges: Vec<Value>, has_next: bool, cursor: &str) -> Value {
        json!({
            "page_info": {"has_next_page": has_next, "end_cursor": cursor},
            "edges": edges
        })
    }

    fn root_page(edges: Vec<Value>, has_next: bool, cursor: &str) -> String {
        json!({"graphql": {"user": {
            "id": "42",
            "username": "demo",
            "edge_owner_to_timeline_media": timeline(edges, has_next, cursor)
        }}})
        .to_string()
    }

    fn next_page(edges: Vec<Value>, has_next: bool, cursor: &str) -> String {
        json!({"status": "ok", "data": {"user": {
            "edge_owner_to_timeline_media": timeline(edges, has_next, cursor)
        }}})
        .to_string()
    }

    fn root_url() -> String {
        Endpoints::with_base(BASE).root_page("demo")
    }

    fn next_url(cursor: &str) -> String {
        Endpoints::with_base(BASE).next_page("42", cursor)
    }

    struct Harness {
        walker: PaginationWalker,
        fetcher: Arc<ScriptedFetcher>,
        gate: Arc<RateLimitGate>,
        stats: Arc<RunStats>,
    }

    fn harness(fetcher: ScriptedFetcher, options: WalkOptions) -> Harness {
        let fetcher = Arc::new(fetcher);
        let cancel = CancellationToken::new();
        let gate = Arc::new(RateLimitGate::new(Duration::from_millis(20), cancel.clone()));
        let stats = Arc::new(RunStats::new());
        let walker = PaginationWalker::new(
            fetcher.clone(),
            Arc::new(Endpoints::with_base(BASE)),
            gate.clone(),
            stats.clone(),
            options,
            cancel,
        );
        Harness {
            walker,
            fetcher,
            gate,
            stats,
        }
    }

    async fn run(h: &Harness) -> (Result<WalkSummary, WalkError>, Vec<DownloadItem>) {
        let (tx, mut rx) = mpsc::channel(64);
        let result = h.walker.walk("demo", &tx).await;
        drop(tx);

        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        (result, items)
    }

    #[tokio::test]
    async fn test_walk_stops_when_no_more_pages() {
        let fetcher = ScriptedFetcher::new()
            .page(
                root_url(),
                &root_page(vec![image_edge("a", "https://cdn/a.jpg", 1)], true, "c1"),
            )
            .page(
                next_url("c1"),
                &next_page(vec![image_edge("b", "https://cdn/b.jpg", 2)], false, "c2"),
            );
        let h = harness(fetcher, WalkOptions::default());

        let (result, items) = run(&h).await;
        let summary = result.unwrap();

        assert_eq!(summary.pages, 2);
        assert_eq!(summary.items_queued, 2);
        assert_eq!(items.len(), 2);
        assert_eq!(h.fetcher.calls_matching("after=c2"), 0);
        assert_eq!(h.fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_latest_only_fetches_root_page() {
        let fetcher = ScriptedFetcher::new().page(
            root_url(),
            &root_page(vec![image_edge("a", "https://cdn/a.jpg", 1)], true, "c1"),
        );
        let h = harness(
            fetcher,
            WalkOptions {
                latest_only: true,
                ..Default::default()
            },
        );

        let (result, items) = run(&h).await;
        assert_eq!(result.unwrap().pages, 1);
        assert_eq!(items.len(), 1);
        assert_eq!(h.fetcher.calls(), vec![root_url()]);
    }

    #[tokio::test]
    async fn test_empty_page_mid_stream_continues() {
        let fetcher = ScriptedFetcher::new()
            .page(root_url(), &root_page(vec![], true, "c1"))
            .page(
                next_url("c1"),
                &next_page(vec![image_edge("b", "https://cdn/b.jpg", 2)], false, ""),
            );
        let h = harness(fetcher, WalkOptions::default());

        let (result, items) = run(&h).await;
        assert_eq!(result.unwrap().pages, 2);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://cdn/b.jpg");
    }

    #[tokio::test]
    async fn test_empty_last_page_ends_cleanly() {
        let fetcher = ScriptedFetcher::new().page(root_url(), &root_page(vec![], false, ""));
        let h = harness(fetcher, WalkOptions::default());

        let (result, items) = run(&h).await;
        let summary = result.unwrap();
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.entries, 0);
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_block_on_root_retries_same_page_after_cooldown() {
        let fetcher = ScriptedFetcher::new().replies(
            root_url(),
            vec![
                Reply::html(),
                Reply::json(&root_page(
                    vec![image_edge("a", "https://cdn/a.jpg", 1)],
                    false,
                    "",
                )),
            ],
        );
        let h = harness(fetcher, WalkOptions::default());

        let (result, items) = run(&h).await;
        assert!(result.is_ok());
        assert_eq!(items.len(), 1);
        assert_eq!(h.fetcher.calls(), vec![root_url(), root_url()]);
        assert_eq!(h.gate.events(), 1);
    }

    #[tokio::test]
    async fn test_block_on_next_page_retries_same_cursor() {
        let fetcher = ScriptedFetcher::new()
            .page(
                root_url(),
                &root_page(vec![image_edge("a", "https://cdn/a.jpg", 1)], true, "c1"),
            )
            .replies(
                next_url("c1"),
                vec![
                    Reply::html(),
                    Reply::json(&next_page(
                        vec![image_edge("b", "https://cdn/b.jpg", 2)],
                        false,
                        "",
                    )),
                ],
            );
        let h = harness(fetcher, WalkOptions::default());

        let (result, items) = run(&h).await;
        assert_eq!(result.unwrap().pages, 2);
        assert_eq!(items.len(), 2);
        assert_eq!(h.fetcher.calls_matching("after=c1"), 2);
    }

    #[tokio::test]
    async fn test_error_status_is_treated_as_block() {
        let fetcher = ScriptedFetcher::new().replies(
            root_url(),
            vec![
                Reply::Status(429),
                Reply::json(&root_page(
                    vec![image_edge("a", "https://cdn/a.jpg", 1)],
                    false,
                    "",
                )),
            ],
        );
        let h = harness(fetcher, WalkOptions::default());

        let (result, items) = run(&h).await;
        assert_eq!(result.unwrap().pages, 1);
        assert_eq!(items.len(), 1);
        assert_eq!(h.gate.events(), 1);
    }

    #[tokio::test]
    async fn test_repeated_block_aborts_account() {
        let fetcher = ScriptedFetcher::new()
            .page(
                root_url(),
                &root_page(vec![image_edge("a", "https://cdn/a.jpg", 1)], true, "c1"),
            )
            .replies(next_url("c1"), vec![Reply::html()]);
        let h = harness(fetcher, WalkOptions::default());

        let (result, items) = run(&h).await;
        assert!(matches!(result, Err(WalkError::RateLimited(_))));
        // Items from the root page were already queued.
        assert_eq!(items.len(), 1);
        assert_eq!(h.gate.events(), 2);
    }

    #[tokio::test]
    async fn test_blocked_sub_fetch_drops_item_and_continues() {
        let video = json!({"node": {"__typename": "GraphVideo", "shortcode": "v1"}});
        let fetcher = ScriptedFetcher::new()
            .page(
                root_url(),
                &root_page(
                    vec![video, image_edge("a", "https://cdn/a.jpg", 1)],
                    false,
                    "",
                ),
            )
            .replies(format!("{}/p/v1/?__a=1", BASE), vec![Reply::html()]);
        let h = harness(fetcher, WalkOptions::default());

        let (result, items) = run(&h).await;
        let summary = result.unwrap();
        assert_eq!(summary.entries_dropped, 1);
        assert_eq!(items.len(), 1);
        assert_eq!(h.stats.snapshot().lost_to_rate_limit, 1);
        assert_eq!(h.fetcher.calls_matching("/p/v1/"), 1);
    }

    #[tokio::test]
    async fn test_unparseable_root_page_aborts() {
        let fetcher = ScriptedFetcher::new().page(root_url(), r#"{"graphql": {}}"#);
        let h = harness(fetcher, WalkOptions::default());

        let (result, _) = run(&h).await;
        assert!(matches!(
            result,
            Err(WalkError::Parse {
                source: ParseError::MissingField(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_repeated_cursor_ends_walk() {
        let fetcher = ScriptedFetcher::new()
            .page(root_url(), &root_page(vec![], true, "loop"))
            .page(next_url("loop"), &next_page(vec![], true, "loop"));
        let h = harness(fetcher, WalkOptions::default());

        let (result, _) = run(&h).await;
        assert_eq!(result.unwrap().pages, 2);
        assert_eq!(h.fetcher.calls_matching("after=loop"), 1);
    }

    #[tokio::test]
    async fn test_items_keep_page_order() {
        let edges = (0..10)
            .map(|i| image_edge(&format!("s{}", i), &format!("https://cdn/{}.jpg", i), i))
            .collect();
        let fetcher = ScriptedFetcher::new().page(root_url(), &root_page(edges, false, ""));
        let h = harness(
            fetcher,
            WalkOptions {
                resolve_concurrency: 3,
                ..Default::default()
            },
        );

        let (_, items) = run(&h).await;
        let shortcodes: Vec<_> = items.iter().map(|i| i.shortcode.clone()).collect();
        let expected: Vec<_> = (0..10).map(|i| format!("s{}", i)).collect();
        assert_eq!(shortcodes, expected);
    }
}
