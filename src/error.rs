//! Error types for instafetch.
//!
//! The crawl pipeline has one error enum per stage: fetching a page, parsing
//! its JSON, resolving a feed entry, and downloading a single item. Only
//! walk-level failures abort an account; everything below that is logged and
//! dropped by the caller.

use thiserror::Error;

/// Failure to obtain a usable response body.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with HTML (challenge/error page) or a non-2xx
    /// status. Callers treat this as a probable rate-limit signal.
    #[error("Unexpected content (HTTP {status}): {snippet}")]
    UnexpectedContent { status: u16, snippet: String },

    #[error("Empty response body")]
    Empty,

    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether the response looked like a block or challenge page.
    pub fn is_block(&self) -> bool {
        matches!(self, FetchError::UnexpectedContent { .. })
    }
}

/// Malformed or unexpected JSON shape.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("API reported failure: {0}")]
    ApiFailure(String),
}

/// Failure to turn a single feed entry into download items.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Rate limited while fetching post {shortcode}")]
    RateLimited { shortcode: String },

    #[error("Fetching post {shortcode} failed: {source}")]
    SubFetchFailed {
        shortcode: String,
        #[source]
        source: FetchError,
    },

    #[error("Parsing post {shortcode} failed: {source}")]
    Parse {
        shortcode: String,
        #[source]
        source: ParseError,
    },
}

/// Per-item download failure. Never fatal to the worker pool.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Truncated download: expected {expected} bytes, wrote {written}")]
    Truncated { expected: u64, written: u64 },

    #[error("Invalid media URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),
}

/// Failure that aborts one account's pagination walk.
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Fetching page for {account} failed: {source}")]
    Fetch {
        account: String,
        #[source]
        source: FetchError,
    },

    #[error("Parsing page for {account} failed: {source}")]
    Parse {
        account: String,
        #[source]
        source: ParseError,
    },

    #[error("Still rate limited after cooldown while crawling {0}")]
    RateLimited(String),

    #[error("Item queue closed")]
    QueueClosed,

    #[error("Walk cancelled")]
    Cancelled,
}

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Run outcome errors
    #[error("{failed} account(s) failed")]
    AccountsFailed { failed: u64 },

    #[error("Completed with {0} dropped or failed item(s)")]
    CompletedWithDrops(u64),

    #[error("Run cancelled")]
    Cancelled,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const CONFIG_ERROR: i32 = 3;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const SOME_USERS_FAILED: i32 = 6;
    pub const COMPLETED_WITH_DROPS: i32 = 7;
}

impl Error {
    /// Map an error to the process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::ConfigValidation { .. } | Error::MissingConfig(_) => {
                exit_codes::CONFIG_ERROR
            }
            Error::TomlParse(_) => exit_codes::CONFIG_ERROR,
            Error::AccountsFailed { .. } => exit_codes::SOME_USERS_FAILED,
            Error::CompletedWithDrops(_) => exit_codes::COMPLETED_WITH_DROPS,
            Error::Cancelled => exit_codes::ABORT,
            _ => exit_codes::UNEXPECTED_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_classification() {
        let blocked = FetchError::UnexpectedContent {
            status: 200,
            snippet: "<!DOCTYPE html>".into(),
        };
        assert!(blocked.is_block());
        assert!(!FetchError::Empty.is_block());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            Error::Config("bad".into()).exit_code(),
            exit_codes::CONFIG_ERROR
        );
        assert_eq!(
            Error::AccountsFailed { failed: 1 }.exit_code(),
            exit_codes::SOME_USERS_FAILED
        );
        assert_eq!(
            Error::CompletedWithDrops(3).exit_code(),
            exit_codes::COMPLETED_WITH_DROPS
        );
        assert_eq!(Error::Cancelled.exit_code(), exit_codes::ABORT);
    }
}
