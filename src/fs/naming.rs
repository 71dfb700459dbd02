//! Filename derivation and sanitising.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::DownloadError;

/// Validate and sanitize a filename by replacing invalid characters.
///
/// Returns an error if the filename is, or contains, a `.`/`..` path segment.
/// Dots inside a name (`clip..mp4`) are fine.
pub fn sanitize_filename(name: &str) -> Result<String, DownloadError> {
    if is_traversal(name) {
        return Err(DownloadError::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(DownloadError::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(DownloadError::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    let sanitized = replace_reserved(name);

    if sanitized.trim().is_empty() {
        return Err(DownloadError::InvalidFilename(
            "Filename cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Sanitize an account name for use as a directory.
///
/// Separators are replaced rather than rejected; traversal is still rejected.
pub fn sanitize_path_component(name: &str) -> Result<String, DownloadError> {
    if is_traversal(name) {
        return Err(DownloadError::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(DownloadError::InvalidFilename(format!(
            "Null bytes not allowed: '{}'",
            name
        )));
    }

    let sanitized: String = replace_reserved(name)
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    if sanitized.trim().is_empty() {
        return Err(DownloadError::InvalidFilename(
            "Path component cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

fn is_traversal(name: &str) -> bool {
    name == "." || name.split(['/', '\\']).any(|segment| segment == "..")
}

fn replace_reserved(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Last segment of a URL's path, percent-decoded, without query or fragment.
pub fn url_basename(url: &str) -> Result<String, DownloadError> {
    let parsed = Url::parse(url).map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", url, e)))?;

    let basename = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DownloadError::InvalidUrl(format!("No file name in URL: {}", url)))?;

    let decoded = urlencoding::decode(basename)
        .map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", url, e)))?;

    sanitize_filename(&decoded)
}

/// Destination filename `{YYYY-MM-DD}_{account}_{basename}`.
///
/// Example: `2017-11-05_alexandrabring_22860351_504365496598712_n.jpg`.
/// The name is the deduplication key; identical inputs always give the
/// same name.
pub fn derive_filename(
    created: &DateTime<Utc>,
    account: &str,
    url: &str,
) -> Result<String, DownloadError> {
    let date = created.format("%Y-%m-%d");
    let account = sanitize_path_component(account)?;
    let basename = url_basename(url)?;

    Ok(format!("{}_{}_{}", date, account, basename))
}
