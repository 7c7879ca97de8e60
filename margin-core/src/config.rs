//! Updater configuration, optionally loaded from a TOML file.
//!
//! ```toml
//! [feed]
//! url = "https://www.cmegroup.com/CmeWS/mvc/Margins/OUTRIGHT.csv"
//! timeout_secs = 30
//! max_retries = 3
//! retry_base_delay_ms = 500
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outright margin feed published by CME Group.
pub const DEFAULT_FEED_URL: &str = "https://www.cmegroup.com/CmeWS/mvc/Margins/OUTRIGHT.csv";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdaterConfig {
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Backoff before retry `n` is `retry_base_delay_ms * 2^(n-1)`.
    pub retry_base_delay_ms: u64,
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl UpdaterConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: UpdaterConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.feed.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "feed.url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.feed.timeout_secs == 0 {
            return Err(ConfigError::Invalid("feed.timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = UpdaterConfig::from_toml("").unwrap();
        assert_eq!(config, UpdaterConfig::default());
        assert_eq!(config.feed.url, DEFAULT_FEED_URL);
        assert_eq!(config.feed.max_retries, 3);
        assert_eq!(config.feed.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_feed_section_overrides_only_given_keys() {
        let config = UpdaterConfig::from_toml(
            r#"
            [feed]
            url = "http://localhost:8080/OUTRIGHT.csv"
            max_retries = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.feed.url, "http://localhost:8080/OUTRIGHT.csv");
        assert_eq!(config.feed.max_retries, 0);
        assert_eq!(config.feed.retry_base_delay(), Duration::from_millis(500));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = UpdaterConfig::from_toml("[feed]\nurll = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = UpdaterConfig::from_toml("[feed]\nurl = \"ftp://example.com/x.csv\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = UpdaterConfig::from_toml("[feed]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = UpdaterConfig::load(Path::new("/nonexistent/cme-margin.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
