//! Remote API module.
//!
//! This module provides:
//! - HTTP page fetching with browser-like headers
//! - The fixed endpoint set (root page, continuation page, single post)
//! - Tolerant JSON access and page/post parsing

pub mod client;
pub mod json;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{classify_body, Endpoints, Fetch, HttpFetcher, MediaBody};
pub use types::{parse_next_page, parse_post, parse_root_page, AccountInfo, FeedPage, PostDetail};
