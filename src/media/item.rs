//! Feed entries and downloadable items.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::DownloadError;
use crate::fs::naming::derive_filename;

/// Type of a concrete media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Map an API `__typename` to a concrete media kind.
    pub fn from_typename(typename: &str) -> Option<Self> {
        match typename {
            "GraphImage" => Some(MediaKind::Image),
            "GraphVideo" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// Fields shared by every feed entry kind.
///
/// Preview fields are only present depending on whether the entry came from a
/// summary page or a drill-down fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryMeta {
    /// Per-post identifier used for follow-up fetches.
    pub shortcode: String,
    pub taken_at: Option<DateTime<Utc>>,
    pub likes: Option<i64>,
}

/// One entry of an account's media timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEntry {
    /// A single image; the summary payload already carries its URL.
    Image {
        meta: EntryMeta,
        url: Option<String>,
    },
    /// A single video; the summary URL is a low-quality placeholder.
    Video {
        meta: EntryMeta,
        view_count: Option<i64>,
    },
    /// A multi-item post whose children are only listed by the post endpoint.
    Carousel { meta: EntryMeta },
    /// A kind this crate does not know about.
    Unknown { meta: EntryMeta, typename: String },
}

impl FeedEntry {
    pub fn meta(&self) -> &EntryMeta {
        match self {
            FeedEntry::Image { meta, .. }
            | FeedEntry::Video { meta, .. }
            | FeedEntry::Carousel { meta }
            | FeedEntry::Unknown { meta, .. } => meta,
        }
    }

    pub fn shortcode(&self) -> &str {
        &self.meta().shortcode
    }

    /// Short label for log output.
    pub fn kind_name(&self) -> &str {
        match self {
            FeedEntry::Image { .. } => "image",
            FeedEntry::Video { .. } => "video",
            FeedEntry::Carousel { .. } => "carousel",
            FeedEntry::Unknown { typename, .. } => typename,
        }
    }
}

/// A single resolved media file, handed to exactly one download worker.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadItem {
    /// Owning account (username); also the output subdirectory.
    pub account: String,

    /// Direct media URL.
    pub url: String,

    /// Creation time, used for filename ordering.
    pub created: DateTime<Utc>,

    /// Shortcode of the originating post, for diagnostics.
    pub shortcode: String,

    pub kind: MediaKind,
}

impl DownloadItem {
    /// Destination filename: `{YYYY-MM-DD}_{account}_{url basename}`.
    pub fn filename(&self) -> Result<String, DownloadError> {
        derive_filename(&self.created, &self.account, &self.url)
    }
}

/// Convert a unix timestamp in seconds to UTC.
pub fn timestamp_to_utc(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_typename() {
        assert_eq!(MediaKind::from_typename("GraphImage"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_typename("GraphVideo"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_typename("GraphSidecar"), None);
    }

    #[test]
    fn test_item_filename() {
        let item = DownloadItem {
            account: "demo".into(),
            url: "https://cdn.example.com/t51/photo_123.jpg?ig_cache_key=abc".into(),
            created: timestamp_to_utc(1_577_836_800).unwrap(),
            shortcode: "BQDv0YMAvzi".into(),
            kind: MediaKind::Image,
        };
        assert_eq!(item.filename().unwrap(), "2020-01-01_demo_photo_123.jpg");
    }

    #[test]
    fn test_entry_accessors() {
        let entry = FeedEntry::Unknown {
            meta: EntryMeta {
                shortcode: "abc".into(),
                ..Default::default()
            },
            typename: "GraphReel".into(),
        };
        assert_eq!(entry.shortcode(), "abc");
        assert_eq!(entry.kind_name(), "GraphReel");
    }
}
