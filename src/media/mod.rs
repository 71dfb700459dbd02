//! Media module: feed entries, download items, and entry resolution.

pub mod item;
pub mod parser;
pub mod resolver;

pub use item::{DownloadItem, EntryMeta, FeedEntry, MediaKind};
pub use parser::{parse_child, parse_entry};
pub use resolver::MediaResolver;
