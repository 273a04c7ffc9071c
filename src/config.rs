//! User configuration loaded from `<config_dir>/chatfs/config.toml`.
//!
//! Every field has a default, so a missing file (or a partial one) is fine. The data directory
//! can also be overridden with `CHATFS_DATA_DIR`, and the CLI's `--data-dir` wins over both.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`Config::data_dir`]
pub const DATA_DIR_ENV: &str = "CHATFS_DATA_DIR";

const APP_DIR_NAME: &str = "chatfs";
const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the conversation store and analytics records
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How long a directory listing stays cached (default: 2 seconds)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: f64,

    /// Model name reported as `$MODEL`
    #[serde(default = "default_model")]
    pub model: String,

    /// Provider name reported as `$PROVIDER`
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Maximum width of message previews in listings
    #[serde(default = "default_preview_width")]
    pub preview_width: usize,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR_NAME)
}

fn default_cache_ttl_secs() -> f64 {
    2.0
}

fn default_model() -> String {
    "unknown".to_string()
}

fn default_provider() -> String {
    "none".to_string()
}

fn default_preview_width() -> usize {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_ttl_secs: default_cache_ttl_secs(),
            model: default_model(),
            provider: default_provider(),
            preview_width: default_preview_width(),
        }
    }
}

impl Config {
    /// Load from the platform config directory, applying the environment override
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };

        if let Ok(dir) = env::var(DATA_DIR_ENV)
            && !dir.trim().is_empty()
        {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Parse a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILENAME))
    }

    /// Listing cache lifetime; negative or non-finite values disable caching, values too large
    /// for a `Duration` saturate
    pub fn cache_ttl(&self) -> Duration {
        if self.cache_ttl_secs.is_finite() && self.cache_ttl_secs > 0.0 {
            Duration::try_from_secs_f64(self.cache_ttl_secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }

    /// Where conversation records live inside the data directory
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("conversations")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(2));
        assert_eq!(config.preview_width, 60);
        assert!(config.data_dir.ends_with("chatfs"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"model = \"gpt-test\"\ncache_ttl_secs = 5.0\n").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.model, "gpt-test");
        assert_eq!(config.cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.provider, "none");
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"cache_ttl_secs = \"soon\"").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_non_positive_ttl_disables_cache() {
        let config = Config { cache_ttl_secs: -1.0, ..Config::default() };
        assert_eq!(config.cache_ttl(), Duration::ZERO);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"cache_ttl_secs = 1e30\n").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.cache_ttl(), Duration::MAX);
    }

    #[test]
    fn test_store_dir_under_data_dir() {
        let config = Config { data_dir: PathBuf::from("/tmp/x"), ..Config::default() };
        assert_eq!(config.store_dir(), PathBuf::from("/tmp/x/conversations"));
    }
}
