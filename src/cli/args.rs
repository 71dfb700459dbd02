//! Command-line argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, RunMode, DEFAULT_CONFIG_FILE};

/// Account media backup CLI.
#[derive(Parser, Debug)]
#[command(
    name = "instafetch",
    version,
    about = "Back up the photos and videos of public accounts",
    long_about = "Crawls the media timeline of one or more public accounts and saves every \
                  photo and video as {date}_{account}_{name} under a folder per account.\n\n\
                  Files already on disk are never fetched again, so repeated runs only pick up new posts."
)]
pub struct Args {
    /// Account(s) to back up.
    /// Can specify multiple accounts separated by spaces.
    #[arg(short, long = "username", num_args = 1..)]
    pub usernames: Vec<String>,

    /// Re-crawl every account already present in the output directory.
    #[arg(long)]
    pub update: bool,

    /// Only fetch the most recent page of each account.
    #[arg(short, long)]
    pub latest: bool,

    /// Root directory for downloads.
    #[arg(short, long, env = "INSTAFETCH_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "INSTAFETCH_CONFIG")]
    pub config: PathBuf,

    /// Number of concurrent download workers.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Seconds to pause the whole crawl after a rate limit.
    #[arg(long)]
    pub cooldown: Option<u64>,

    /// Delete partially written files when a download fails.
    #[arg(long)]
    pub remove_partial: bool,

    /// Only print warnings and errors (for scheduled runs).
    #[arg(long, short, visible_alias = "cron")]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(long, short)]
    pub debug: bool,
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(self, config: &mut Config) {
        if !self.usernames.is_empty() {
            config.target.usernames = self.usernames;
        }

        if self.update {
            config.options.mode = RunMode::Update;
        }

        if let Some(dir) = self.output {
            config.options.output_directory = Some(dir);
        }

        if let Some(workers) = self.workers {
            config.options.download_workers = workers;
        }

        if let Some(cooldown) = self.cooldown {
            config.options.rate_limit_cooldown_seconds = cooldown;
        }

        // Boolean flags (only override if set to non-default)
        if self.latest {
            config.options.latest_only = true;
        }

        if self.remove_partial {
            config.options.remove_partial_downloads = true;
        }

        if self.quiet {
            config.options.quiet = true;
        }
    }
}
