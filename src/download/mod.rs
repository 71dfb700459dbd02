//! Download module: the crawl pipeline.
//!
//! This module provides:
//! - Crawl-wide rate-limit cooldown
//! - Per-account pagination walking
//! - The bounded download queue and its worker pool
//! - Run statistics and the top-level orchestrator

pub mod gate;
pub mod orchestrator;
pub mod state;
pub mod walker;
pub mod worker;

pub use gate::RateLimitGate;
pub use orchestrator::{Orchestrator, RunPlan, RunReport};
pub use state::{AccountReport, RunStats, StatsSnapshot, WalkSummary};
pub use walker::{PaginationWalker, WalkOptions};
pub use worker::{DownloadOutcome, DownloadWorkerPool, Downloader, PoolOptions};
