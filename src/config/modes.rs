//! Run mode definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which accounts a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// The usernames named in config or on the command line (default).
    #[default]
    Single,
    /// Every account already present under the output root.
    Update,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Single => write!(f, "single"),
            RunMode::Update => write!(f, "update"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(RunMode::Single),
            "update" => Ok(RunMode::Update),
            _ => Err(format!("Unknown run mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        assert_eq!("Update".parse::<RunMode>().unwrap(), RunMode::Update);
        assert_eq!(RunMode::Single.to_string(), "single");
        assert!("timeline".parse::<RunMode>().is_err());
    }
}
