//! Output directory layout: `{output_root}/{account}/`.

use std::path::{Path, PathBuf};

use crate::error::{DownloadError, Result};
use crate::fs::naming::sanitize_path_component;

/// Default output root: `output/` next to the executable.
pub fn default_output_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("output")
}

/// Per-account directory under the output root.
pub fn account_dir(output_root: &Path, account: &str) -> std::result::Result<PathBuf, DownloadError> {
    Ok(output_root.join(sanitize_path_component(account)?))
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Accounts backed up by earlier runs: every non-hidden subdirectory of the
/// output root, sorted. A missing root yields no accounts.
pub fn discover_accounts(output_root: &Path) -> Result<Vec<String>> {
    if !output_root.exists() {
        return Ok(Vec::new());
    }

    let mut accounts = Vec::new();
    for entry in std::fs::read_dir(output_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) if !name.starts_with('.') => accounts.push(name),
            Ok(_) => {}
            Err(name) => tracing::warn!("Skipping non UTF-8 directory {:?}", name),
        }
    }

    accounts.sort();
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_dir() {
        let root = PathBuf::from("/backups");
        assert_eq!(
            account_dir(&root, "demo").unwrap(),
            PathBuf::from("/backups/demo")
        );
        assert!(account_dir(&root, "..").is_err());
    }

    #[test]
    fn test_discover_accounts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::create_dir(dir.path().join(".cache")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let accounts = discover_accounts(dir.path()).unwrap();
        assert_eq!(accounts, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn test_discover_accounts_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_accounts(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_ensure_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }
}
