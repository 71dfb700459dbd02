//! instafetch - account media backup.
//!
//! Crawls the paginated media timeline of public accounts, resolves every
//! post to its direct media URLs and saves each file once under
//! `{output}/{account}/{YYYY-MM-DD}_{account}_{name}`.
//!
//! # Features
//!
//! - Cursor-based pagination with an optional latest-page-only mode
//! - Carousel and video resolution through per-post lookups
//! - Bounded queue feeding a fixed pool of download workers
//! - Crawl-wide cooldown when rate limiting is detected
//! - Deduplication by exclusive file creation, so reruns only add new files
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use instafetch::{Config, Endpoints, HttpFetcher, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("instafetch.toml"))?;
//!     let cancel = CancellationToken::new();
//!     let fetcher = Arc::new(HttpFetcher::new(config.request_timeout(), cancel.clone())?);
//!
//!     let report = Orchestrator::new(fetcher, Endpoints::default(), cancel)
//!         .run(config.run_plan())
//!         .await?;
//!     println!("{} file(s) downloaded", report.stats.total_downloaded());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod media;
pub mod output;

// Re-exports for convenience
pub use api::{Endpoints, Fetch, HttpFetcher};
pub use config::{Config, RunMode};
pub use download::{Orchestrator, RunPlan, RunReport};
pub use error::{Error, Result};
pub use media::{DownloadItem, FeedEntry, MediaKind};
