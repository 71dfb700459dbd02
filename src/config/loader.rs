//! Configuration structures and loading logic.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::modes::RunMode;
use crate::download::{PoolOptions, RunPlan, WalkOptions};
use crate::error::{Error, Result};
use crate::fs::default_output_root;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "instafetch.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub options: OptionsConfig,
}

/// Accounts to back up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Usernames, optionally prefixed with `@`.
    #[serde(default)]
    pub usernames: Vec<String>,
}

/// Run options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Root directory for per-account folders.
    #[serde(default)]
    pub output_directory: Option<PathBuf>,

    #[serde(default)]
    pub mode: RunMode,

    /// Only crawl the first page of each account.
    #[serde(default)]
    pub latest_only: bool,

    /// Suppress per-file output and the final summary.
    #[serde(default)]
    pub quiet: bool,

    #[serde(default = "default_download_workers")]
    pub download_workers: usize,

    /// Capacity of the bounded item queue between crawlers and workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Accounts crawled at the same time. More than one tends to trip the
    /// service's flood protection.
    #[serde(default = "default_max_concurrent_walks")]
    pub max_concurrent_walks: usize,

    /// Entries resolved concurrently per page.
    #[serde(default = "default_resolve_concurrency")]
    pub resolve_concurrency: usize,

    #[serde(default = "default_cooldown")]
    pub rate_limit_cooldown_seconds: u64,

    /// Jittered delay between page fetches, `[min, max]` milliseconds.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: [u64; 2],

    /// Delete partially written files when a transfer fails.
    #[serde(default)]
    pub remove_partial_downloads: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            output_directory: None,
            mode: RunMode::default(),
            latest_only: false,
            quiet: false,
            download_workers: default_download_workers(),
            queue_capacity: default_queue_capacity(),
            max_concurrent_walks: default_max_concurrent_walks(),
            resolve_concurrency: default_resolve_concurrency(),
            rate_limit_cooldown_seconds: default_cooldown(),
            page_delay_ms: default_page_delay(),
            remove_partial_downloads: false,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_download_workers() -> usize {
    3
}

fn default_queue_capacity() -> usize {
    16
}

fn default_max_concurrent_walks() -> usize {
    1
}

fn default_resolve_concurrency() -> usize {
    4
}

fn default_cooldown() -> u64 {
    60
}

fn default_page_delay() -> [u64; 2] {
    [500, 1500]
}

fn default_request_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!("Configuration file not found: {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise start from defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the effective output root.
    pub fn output_directory(&self) -> PathBuf {
        self.options
            .output_directory
            .clone()
            .unwrap_or_else(default_output_root)
    }

    /// Configured usernames with any leading `@` removed, duplicates dropped.
    pub fn usernames(&self) -> Vec<String> {
        let mut seen = Vec::with_capacity(self.target.usernames.len());
        for name in &self.target.usernames {
            let name = name.trim().trim_start_matches('@').to_string();
            if !name.is_empty() && !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    pub fn walk_options(&self) -> WalkOptions {
        let [min, max] = self.options.page_delay_ms;
        WalkOptions {
            latest_only: self.options.latest_only,
            resolve_concurrency: self.options.resolve_concurrency,
            page_delay_ms: (min, max),
        }
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            workers: self.options.download_workers,
            remove_partial: self.options.remove_partial_downloads,
            show_downloads: !self.options.quiet,
            show_progress: !self.options.quiet,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.options.request_timeout_seconds)
    }

    /// Default log filter once the CLI has been merged in. `--debug` wins
    /// over `quiet`.
    pub fn log_level(&self, debug: bool) -> &'static str {
        if debug {
            "debug"
        } else if self.options.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Build the run plan. Update mode leaves the account list empty so the
    /// output root is scanned instead.
    pub fn run_plan(&self) -> RunPlan {
        let accounts = match self.options.mode {
            RunMode::Single => self.usernames(),
            RunMode::Update => {
                if !self.target.usernames.is_empty() {
                    tracing::warn!("Update mode ignores configured usernames");
                }
                Vec::new()
            }
        };

        RunPlan {
            accounts,
            output_root: self.output_directory(),
            queue_capacity: self.options.queue_capacity,
            max_concurrent_walks: self.options.max_concurrent_walks,
            cooldown: Duration::from_secs(self.options.rate_limit_cooldown_seconds),
            walk: self.walk_options(),
            pool: self.pool_options(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.options.download_workers, 3);
        assert_eq!(config.options.max_concurrent_walks, 1);
        assert_eq!(config.options.rate_limit_cooldown_seconds, 60);
    }

    #[test]
    fn test_parse_file() {
        let config: Config = toml::from_str(
            r#"
            [target]
            usernames = ["@demo", "demo2", "demo"]

            [options]
            output_directory = "/tmp/backup"
            mode = "update"
            latest_only = true
            download_workers = 5
            page_delay_ms = [0, 0]
            "#,
        )
        .unwrap();

        assert_eq!(config.usernames(), vec!["demo", "demo2"]);
        assert_eq!(config.options.mode, RunMode::Update);
        assert_eq!(config.output_directory(), PathBuf::from("/tmp/backup"));
        assert!(config.walk_options().latest_only);
        assert_eq!(config.pool_options().workers, 5);
        assert!(config.run_plan().accounts.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let mut config = Config::default();
        config.target.usernames = vec!["demo".into()];
        config.options.quiet = true;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!loaded.pool_options().show_downloads);
    }

    #[test]
    fn test_quiet_from_file_lowers_log_level() {
        let config: Config = toml::from_str(
            r#"
            [options]
            quiet = true
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level(false), "warn");
        assert_eq!(config.log_level(true), "debug");
        assert_eq!(Config::default().log_level(false), "info");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
        assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
    }
}
