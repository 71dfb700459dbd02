//! Configuration validation logic.

use regex::Regex;

use crate::config::loader::Config;
use crate::config::modes::RunMode;
use crate::error::{Error, Result};

/// Account names: letters, digits, periods and underscores.
const USERNAME_PATTERN: &str = r"^[A-Za-z0-9._]{1,30}$";

const MAX_DOWNLOAD_WORKERS: usize = 16;

const MAX_RESOLVE_CONCURRENCY: usize = 32;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    match config.options.mode {
        RunMode::Single => validate_usernames(&config.target.usernames)?,
        RunMode::Update => {}
    }

    let options = &config.options;
    validate_range(
        "download_workers",
        options.download_workers,
        1,
        MAX_DOWNLOAD_WORKERS,
    )?;
    validate_range(
        "resolve_concurrency",
        options.resolve_concurrency,
        1,
        MAX_RESOLVE_CONCURRENCY,
    )?;
    validate_range("queue_capacity", options.queue_capacity, 1, usize::MAX)?;
    validate_range(
        "max_concurrent_walks",
        options.max_concurrent_walks,
        1,
        usize::MAX,
    )?;

    let [min, max] = options.page_delay_ms;
    if min > max {
        return Err(Error::ConfigValidation {
            field: "page_delay_ms".to_string(),
            message: format!("Minimum delay {} exceeds maximum {}", min, max),
        });
    }

    if options.request_timeout_seconds == 0 {
        return Err(Error::ConfigValidation {
            field: "request_timeout_seconds".to_string(),
            message: "Timeout must be at least one second".to_string(),
        });
    }

    Ok(())
}

fn validate_range(field: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if value < min || value > max {
        let message = if max == usize::MAX {
            format!("Must be at least {} (got {})", min, value)
        } else {
            format!("Must be between {} and {} (got {})", min, max, value)
        };
        return Err(Error::ConfigValidation {
            field: field.to_string(),
            message,
        });
    }
    Ok(())
}

/// Validate account usernames.
pub fn validate_usernames<S: AsRef<str>, I: IntoIterator<Item = S>>(usernames: I) -> Result<()> {
    let usernames: Vec<_> = usernames.into_iter().collect();

    if usernames.is_empty() {
        return Err(Error::MissingConfig(
            "usernames (name at least one account, or use update mode)".to_string(),
        ));
    }

    let username_pattern = Regex::new(USERNAME_PATTERN)
        .map_err(|e| Error::Config(format!("Invalid username pattern: {}", e)))?;

    for username in usernames {
        let username = username.as_ref();

        // Remove leading @ if present
        let clean_username = username.trim().trim_start_matches('@');

        if !username_pattern.is_match(clean_username) {
            return Err(Error::ConfigValidation {
                field: "usernames".to_string(),
                message: format!(
                    "Username '{}' is invalid. Use 1-30 letters, digits, periods or underscores.",
                    username
                ),
            });
        }
    }

    Ok(())
}
