use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::Error;

// Safety limits to prevent resource abuse
pub const DEFAULT_MAX_DEPTH: usize = 32;
pub const DEFAULT_MAX_IN_SET: usize = 1000;

/// What to do with a path that is not in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Reject with `UnknownPath`.
    #[default]
    Strict,
    /// Accept without checking the value.
    Tolerant,
}

/// Knobs shared by every checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub index_mode: IndexMode,
    /// Maximum nesting of logical combinators, sub-paths and sub-pipelines.
    pub max_depth: usize,
    /// Maximum number of entries in `$in`, `$nin`, `$all` and `$each`.
    pub max_in_set: usize,
    /// Compile `$regex` patterns (requires the `regex` feature).
    pub regex_check: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            index_mode: IndexMode::Strict,
            max_depth: DEFAULT_MAX_DEPTH,
            max_in_set: DEFAULT_MAX_IN_SET,
            regex_check: true,
        }
    }
}

impl ValidationConfig {
    pub fn tolerant() -> Self {
        Self { index_mode: IndexMode::Tolerant, ..Self::default() }
    }

    /// Parses a TOML document; missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns [`Error::Toml`] for malformed input.
    pub fn from_toml(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }

    /// Loads the configuration.
    ///
    /// Precedence: `explicit` path > `DOCSAFE_CONFIG` > `./docsafe.toml` >
    /// defaults. `DOCSAFE_INDEX_MODE` and `DOCSAFE_MAX_DEPTH` override the
    /// loaded values.
    ///
    /// # Errors
    /// An explicitly named file that cannot be read or parsed is an error;
    /// an unreadable fallback file is logged and skipped.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        let mut cfg = match explicit {
            Some(p) => Self::from_toml(&std::fs::read_to_string(p)?)?,
            None => Self::from_candidates(&candidate_paths()),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn from_candidates(paths: &[PathBuf]) -> Self {
        for p in paths {
            let Ok(s) = std::fs::read_to_string(p) else { continue };
            match Self::from_toml(&s) {
                Ok(cfg) => {
                    log::debug!("loaded validation config from {}", p.display());
                    return cfg;
                }
                Err(e) => log::warn!("ignoring config {}: {e}", p.display()),
            }
        }
        Self::default()
    }

    fn apply_env(&mut self) {
        if let Ok(s) = std::env::var("DOCSAFE_INDEX_MODE") {
            match s.to_ascii_lowercase().as_str() {
                "strict" => self.index_mode = IndexMode::Strict,
                "tolerant" => self.index_mode = IndexMode::Tolerant,
                other => log::warn!("DOCSAFE_INDEX_MODE: unknown mode {other:?}"),
            }
        }
        if let Ok(s) = std::env::var("DOCSAFE_MAX_DEPTH") {
            match s.parse::<usize>() {
                Ok(n) if n > 0 => self.max_depth = n,
                _ => log::warn!("DOCSAFE_MAX_DEPTH: expected a positive integer, got {s:?}"),
            }
        }
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(p) = std::env::var("DOCSAFE_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join("docsafe.toml"));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = ValidationConfig::from_toml("index_mode = \"tolerant\"\n").unwrap();
        assert_eq!(cfg.index_mode, IndexMode::Tolerant);
        assert_eq!(cfg.max_depth, DEFAULT_MAX_DEPTH);
        assert!(cfg.regex_check);
    }

    #[test]
    fn explicit_file_is_read() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "max_depth = 4\nmax_in_set = 10").unwrap();
        let cfg = ValidationConfig::from_toml(&std::fs::read_to_string(f.path()).unwrap()).unwrap();
        assert_eq!(cfg.max_depth, 4);
        assert_eq!(cfg.max_in_set, 10);
    }

    #[test]
    fn unreadable_candidates_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("docsafe.toml");
        std::fs::write(&bad, "max_depth = \"deep\"").unwrap();
        let cfg = ValidationConfig::from_candidates(&[dir.path().join("missing.toml"), bad]);
        assert_eq!(cfg, ValidationConfig::default());
    }
}
