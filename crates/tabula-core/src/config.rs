//! Sheet configuration.
//!
//! Read from TOML, either a file given explicitly or `config.toml` in the
//! user's config directory:
//!
//! ```toml
//! invalidation = "cache-only"   # or "clear-dependents"
//! ```

use directories::ProjectDirs;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, TabulaError};

const MAX_CONFIG_FILE_BYTES: u64 = 64 * 1024;

/// What happens to the cells that read an edited cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidationPolicy {
    /// Drop the memoized results of all transitive dependents; their
    /// formulas are kept and recomputed on the next read.
    #[default]
    CacheOnly,
    /// Reset every transitive dependent to an empty cell.
    ClearDependents,
}

impl InvalidationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationPolicy::CacheOnly => "cache-only",
            InvalidationPolicy::ClearDependents => "clear-dependents",
        }
    }
}

impl fmt::Display for InvalidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvalidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cache-only" => Ok(InvalidationPolicy::CacheOnly),
            "clear-dependents" => Ok(InvalidationPolicy::ClearDependents),
            other => Err(format!(
                "Unknown invalidation policy '{}' (expected cache-only or clear-dependents)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetConfig {
    pub invalidation: InvalidationPolicy,
}

impl SheetConfig {
    pub fn with_policy(invalidation: InvalidationPolicy) -> Self {
        SheetConfig { invalidation }
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a config file. A missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let config_err = |message: String| TabulaError::Config {
            path: path.to_path_buf(),
            message,
        };
        let meta = std::fs::metadata(path).map_err(|e| config_err(e.to_string()))?;
        if meta.len() > MAX_CONFIG_FILE_BYTES {
            return Err(config_err(format!(
                "file too large ({} bytes, max {})",
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        let config = Self::from_toml(&content).map_err(|e| config_err(e.to_string()))?;
        tracing::debug!(path = %path.display(), invalidation = %config.invalidation, "loaded sheet config");
        Ok(config)
    }

    /// Load the user's config file if there is one, defaults otherwise.
    pub fn load_user() -> Result<Self> {
        match user_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `config.toml` in the platform config directory for tabula.
pub fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "tabula")?;
    Some(proj.config_dir().join("config.toml"))
}
