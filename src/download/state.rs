//! Run statistics shared between producers and download workers.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::media::MediaKind;

/// Run-wide counters, updated concurrently.
#[derive(Debug, Default)]
pub struct RunStats {
    pic_count: AtomicU64,
    vid_count: AtomicU64,
    already_present: AtomicU64,
    download_failures: AtomicU64,
    dropped_items: AtomicU64,
    lost_to_rate_limit: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed download.
    pub fn record_download(&self, kind: MediaKind) {
        match kind {
            MediaKind::Image => self.pic_count.fetch_add(1, Ordering::Relaxed),
            MediaKind::Video => self.vid_count.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record an item whose file already existed.
    pub fn record_already_present(&self) {
        self.already_present.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_download_failure(&self) {
        self.download_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an entry or item that could not be resolved.
    pub fn record_dropped(&self) {
        self.dropped_items.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an item lost because its sub-fetch hit rate limiting.
    pub fn record_lost_to_rate_limit(&self) {
        self.lost_to_rate_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pic_count: self.pic_count.load(Ordering::Relaxed),
            vid_count: self.vid_count.load(Ordering::Relaxed),
            already_present: self.already_present.load(Ordering::Relaxed),
            download_failures: self.download_failures.load(Ordering::Relaxed),
            dropped_items: self.dropped_items.load(Ordering::Relaxed),
            lost_to_rate_limit: self.lost_to_rate_limit.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RunStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub pic_count: u64,
    pub vid_count: u64,
    pub already_present: u64,
    pub download_failures: u64,
    pub dropped_items: u64,
    pub lost_to_rate_limit: u64,
}

impl StatsSnapshot {
    /// Get total downloaded count.
    pub fn total_downloaded(&self) -> u64 {
        self.pic_count + self.vid_count
    }

    /// Items that did not make it to disk.
    pub fn total_missing(&self) -> u64 {
        self.download_failures + self.dropped_items + self.lost_to_rate_limit
    }
}

/// Outcome of one account's pagination walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub account: String,
    pub pages: u64,
    pub entries: u64,
    pub items_queued: u64,
    pub entries_dropped: u64,
}

/// Per-account result as reported at the end of a run.
#[derive(Debug)]
pub struct AccountReport {
    pub account: String,
    pub summary: Option<WalkSummary>,
    pub error: Option<String>,
}

impl AccountReport {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}
