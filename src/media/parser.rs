//! Feed entry parsing from timeline and post JSON nodes.

use serde_json::Value;

use crate::api::json::JsonPath;
use crate::api::types::ChildMedia;
use crate::media::item::{timestamp_to_utc, EntryMeta, FeedEntry, MediaKind};

/// Parse one timeline edge (`{"node": {...}}`) into a feed entry.
///
/// Never fails: unknown or missing kinds become [`FeedEntry::Unknown`] so the
/// resolver can skip them with a warning.
pub fn parse_entry(edge: &Value) -> FeedEntry {
    let node = edge.get("node").unwrap_or(edge);
    let meta = parse_meta(node);

    match node.str_at("/__typename").unwrap_or_default() {
        "GraphImage" => FeedEntry::Image {
            meta,
            url: node.str_at("/display_url").map(str::to_string),
        },
        "GraphVideo" => FeedEntry::Video {
            meta,
            view_count: node.i64_at("/video_view_count"),
        },
        "GraphSidecar" => FeedEntry::Carousel { meta },
        other => FeedEntry::Unknown {
            meta,
            typename: if other.is_empty() {
                "<missing>".to_string()
            } else {
                other.to_string()
            },
        },
    }
}

fn parse_meta(node: &Value) -> EntryMeta {
    EntryMeta {
        shortcode: node.str_at("/shortcode").unwrap_or_default().to_string(),
        taken_at: node.i64_at("/taken_at_timestamp").and_then(timestamp_to_utc),
        likes: node
            .i64_at("/edge_media_preview_like/count")
            .or_else(|| node.i64_at("/edge_liked_by/count")),
    }
}

/// Parse one carousel child edge.
///
/// Children resolve through the same per-type field path as top-level
/// entries: `display_url` for images, `video_url` for videos.
pub fn parse_child(edge: &Value) -> ChildMedia {
    let node = edge.get("node").unwrap_or(edge);
    let typename = node.str_at("/__typename").unwrap_or_default().to_string();
    let kind = MediaKind::from_typename(&typename);

    let url = match kind {
        Some(MediaKind::Image) => node.str_at("/display_url"),
        Some(MediaKind::Video) => node.str_at("/video_url"),
        None => None,
    }
    .filter(|url| !url.is_empty())
    .map(str::to_string);

    ChildMedia {
        kind,
        typename,
        shortcode: node.str_at("/shortcode").map(str::to_string),
        url,
    }
}
