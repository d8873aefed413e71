//! Configuration for version-guard.
//!
//! Looked up in `<repo>/.version-guard.toml`, then
//! `<config dir>/version-guard/config.toml`, then built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;

/// Prefix printed in front of every notice.
pub const NOTICE_PREFIX: &str = "***** PRE PUSH GIT HOOK ***** -";

/// Body of the unchanged-version notice.
pub const NOTICE_MESSAGE: &str = "Project's version has not been updated since the last tag.";

/// Environment variable overriding `marker.file_name`.
pub const MARKER_ENV: &str = "VERSION_GUARD_MARKER";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub marker: MarkerConfig,

    #[serde(default)]
    pub notice: NoticeConfig,

    #[serde(default)]
    pub hook: HookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkerConfig {
    /// File looked up in the root tree of both commits.
    #[serde(default = "default_marker_file")]
    pub file_name: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            file_name: default_marker_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoticeConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HookConfig {
    /// Exit non-zero (blocking the push) when the repository cannot be read.
    #[serde(default = "default_true")]
    pub block_on_error: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            block_on_error: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_marker_file() -> String {
    "VERSION".to_string()
}

fn default_prefix() -> String {
    NOTICE_PREFIX.to_string()
}

impl Config {
    /// Name of the per-repository config file.
    pub const PROJECT_FILE: &'static str = ".version-guard.toml";

    /// Path to the per-repository config file.
    pub fn project_path(repo_root: &Path) -> PathBuf {
        repo_root.join(Self::PROJECT_FILE)
    }

    /// Path to the global config file, if the platform has a config dir.
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("version-guard").join("config.toml"))
    }

    /// Load the effective configuration for a repository.
    pub fn load(repo_root: &Path) -> Result<Self, Error> {
        let candidates = std::iter::once(Self::project_path(repo_root)).chain(Self::global_path());

        let mut config = Self::default();
        for path in candidates {
            if let Some(found) = Self::load_file(&path)? {
                debug!(path = %path.display(), "Loaded config");
                config = found;
                break;
            }
        }

        config.apply_marker_override(std::env::var(MARKER_ENV).ok());
        Ok(config)
    }

    /// Built-in defaults with the environment override applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_marker_override(std::env::var(MARKER_ENV).ok());
        config
    }

    /// Parse one config file. A missing file is `Ok(None)`.
    pub fn load_file(path: &Path) -> Result<Option<Self>, Error> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Some(config))
    }

    fn apply_marker_override(&mut self, value: Option<String>) {
        if let Some(name) = value.filter(|v| !v.trim().is_empty()) {
            self.marker.file_name = name.trim().to_string();
        }
    }

    /// The full line printed when the version is unchanged.
    pub fn notice(&self) -> String {
        format!("{} {}", self.notice.prefix, NOTICE_MESSAGE)
    }

    /// Render as TOML for `status`.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::other(e.to_string()))
    }
}
