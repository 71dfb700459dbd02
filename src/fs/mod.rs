//! Filesystem module.
//!
//! Provides:
//! - Output directory layout and account discovery
//! - Filename derivation (the on-disk deduplication key)

pub mod naming;
pub mod paths;

pub use naming::{derive_filename, sanitize_filename, sanitize_path_component, url_basename};
pub use paths::{account_dir, default_output_root, discover_accounts, ensure_dir};
