//! Configuration module.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Run mode selection
//! - Configuration validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{Config, OptionsConfig, TargetConfig, DEFAULT_CONFIG_FILE};
pub use modes::RunMode;
pub use validation::{validate_config, validate_usernames};
