//! API response types and page/post parsing.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::json::JsonPath;
use crate::error::ParseError;
use crate::media::item::{timestamp_to_utc, FeedEntry, MediaKind};
use crate::media::parser::{parse_child, parse_entry};

/// Account metadata from the root page.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo {
    /// Stable numeric ID, kept as a string for URL building.
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub followers: Option<i64>,
    pub following: Option<i64>,
}

/// One page of an account's media timeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    pub entries: Vec<FeedEntry>,
    /// Opaque continuation cursor; `None` when absent or empty.
    pub cursor: Option<String>,
    pub has_more: bool,
}

impl FeedPage {
    /// Cursor for the following page, if the walk should continue.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_more {
            self.cursor.as_deref()
        } else {
            None
        }
    }
}

/// A carousel child from the post endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildMedia {
    /// `None` for kinds this crate does not recognise.
    pub kind: Option<MediaKind>,
    pub typename: String,
    pub shortcode: Option<String>,
    pub url: Option<String>,
}

/// Full detail of a single post (`shortcode_media`).
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub typename: String,
    pub shortcode: Option<String>,
    pub taken_at: Option<DateTime<Utc>>,
    pub display_url: Option<String>,
    pub video_url: Option<String>,
    pub children: Vec<ChildMedia>,
}

const ROOT_USER: &str = "/graphql/user";
const NEXT_PAGE_MEDIA: &str = "/data/user/edge_owner_to_timeline_media";
const TIMELINE_MEDIA: &str = "/edge_owner_to_timeline_media";
const SHORTCODE_MEDIA: &str = "/graphql/shortcode_media";

/// Parse the root page of an account: metadata plus the first feed page.
pub fn parse_root_page(body: &[u8]) -> Result<(AccountInfo, FeedPage), ParseError> {
    let root: Value = serde_json::from_slice(body)?;
    let user = root
        .pointer(ROOT_USER)
        .ok_or(ParseError::MissingField("graphql.user"))?;

    let account = AccountInfo {
        id: user
            .id_at("/id")
            .ok_or(ParseError::MissingField("graphql.user.id"))?,
        username: user.str_at("/username").unwrap_or_default().to_string(),
        full_name: user
            .str_at("/full_name")
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        followers: user.i64_at("/edge_followed_by/count"),
        following: user.i64_at("/edge_follow/count"),
    };

    let media = user.pointer(TIMELINE_MEDIA).unwrap_or(&Value::Null);
    Ok((account, parse_timeline_media(media)))
}

/// Parse a continuation page from the cursor endpoint.
pub fn parse_next_page(body: &[u8]) -> Result<FeedPage, ParseError> {
    let root: Value = serde_json::from_slice(body)?;

    if root.str_at("/status") == Some("fail") {
        let message = root
            .str_at("/message")
            .unwrap_or("unspecified failure")
            .to_string();
        return Err(ParseError::ApiFailure(message));
    }

    let media = root
        .pointer(NEXT_PAGE_MEDIA)
        .ok_or(ParseError::MissingField("data.user.edge_owner_to_timeline_media"))?;

    Ok(parse_timeline_media(media))
}

fn parse_timeline_media(media: &Value) -> FeedPage {
    FeedPage {
        entries: media.array_at("/edges").iter().map(parse_entry).collect(),
        cursor: media
            .str_at("/page_info/end_cursor")
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        has_more: media.bool_at("/page_info/has_next_page"),
    }
}

/// Parse a single post from the per-post endpoint.
pub fn parse_post(body: &[u8]) -> Result<PostDetail, ParseError> {
    let root: Value = serde_json::from_slice(body)?;
    let node = root
        .pointer(SHORTCODE_MEDIA)
        .ok_or(ParseError::MissingField("graphql.shortcode_media"))?;

    Ok(PostDetail {
        typename: node.str_at("/__typename").unwrap_or_default().to_string(),
        shortcode: node.str_at("/shortcode").map(str::to_string),
        taken_at: node
            .i64_at("/taken_at_timestamp")
            .and_then(timestamp_to_utc),
        display_url: node.str_at("/display_url").map(str::to_string),
        video_url: node
            .str_at("/video_url")
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        children: node
            .array_at("/edge_sidecar_to_children/edges")
            .iter()
            .map(parse_child)
            .collect(),
    })
}
