//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Upstream API access settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Crawl loop behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Rank formula tuning
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Durable snapshot settings
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::validation("api.base_url is empty"));
        }
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.api.max_attempts == 0 {
            return Err(AppError::validation("api.max_attempts must be > 0"));
        }
        if self.crawler.cycle_secs == 0 {
            return Err(AppError::validation("crawler.cycle_secs must be > 0"));
        }
        if self.crawler.progress_interval == 0 {
            return Err(AppError::validation(
                "crawler.progress_interval must be > 0",
            ));
        }
        if self.ranking.decay_exponent <= 0.0 {
            return Err(AppError::validation("ranking.decay_exponent must be > 0"));
        }
        if self.ranking.min_age_secs == 0 {
            return Err(AppError::validation("ranking.min_age_secs must be > 0"));
        }
        if self.snapshot.interval_secs == 0 {
            return Err(AppError::validation("snapshot.interval_secs must be > 0"));
        }
        Ok(())
    }
}

/// Upstream API access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the upstream REST API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Base URL for shareable deep links
    #[serde(default = "defaults::share_base_url")]
    pub share_base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between channel-listing page fetches in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// Base backoff delay on HTTP 429, multiplied by attempt squared
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_ms: u64,

    /// Hard cap on request attempts while rate limited
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            share_base_url: defaults::share_base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_delay_ms: defaults::page_delay(),
            backoff_base_ms: defaults::backoff_base(),
            max_attempts: defaults::max_attempts(),
        }
    }
}

/// Crawl loop behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum current viewer count for a channel to be crawled.
    /// Production runs use a higher floor than local testing.
    #[serde(default = "defaults::min_viewers")]
    pub min_viewers: u32,

    /// Only crawl channels with this exact language code, when set
    #[serde(default)]
    pub language: Option<String>,

    /// Inter-cycle cooldown in seconds
    #[serde(default = "defaults::cycle_secs")]
    pub cycle_secs: u64,

    /// Publish a progress status every N channels
    #[serde(default = "defaults::progress_interval")]
    pub progress_interval: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            min_viewers: defaults::min_viewers(),
            language: None,
            cycle_secs: defaults::cycle_secs(),
            progress_interval: defaults::progress_interval(),
        }
    }
}

/// Rank formula tuning.
///
/// The decay exponent is deliberately configuration rather than a
/// constant; historical deployments have run both 1.0 and 1.5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Exponent applied to the clip age in days
    #[serde(default = "defaults::decay_exponent")]
    pub decay_exponent: f64,

    /// Floor on the effective age, preventing near-zero divisors for
    /// brand-new clips
    #[serde(default = "defaults::min_age_secs")]
    pub min_age_secs: u64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            decay_exponent: defaults::decay_exponent(),
            min_age_secs: defaults::min_age_secs(),
        }
    }
}

/// Durable snapshot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Minimum interval between durable snapshots in seconds
    #[serde(default = "defaults::snapshot_interval")]
    pub interval_secs: u64,

    /// Schema version tag written into snapshots; a loaded snapshot with a
    /// different version is treated as absent
    #[serde(default = "defaults::snapshot_version")]
    pub version: u32,

    /// Directory for the local snapshot backend
    #[serde(default = "defaults::local_dir")]
    pub local_dir: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::snapshot_interval(),
            version: defaults::snapshot_version(),
            local_dir: defaults::local_dir(),
        }
    }
}

mod defaults {
    // API defaults
    pub fn base_url() -> String {
        "https://mixer.com/api/v1".into()
    }
    pub fn share_base_url() -> String {
        "https://mixer.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; clipmine/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_delay() -> u64 {
        10
    }
    pub fn backoff_base() -> u64 {
        500
    }
    pub fn max_attempts() -> u32 {
        1000
    }

    // Crawler defaults
    pub fn min_viewers() -> u32 {
        2
    }
    pub fn cycle_secs() -> u64 {
        300
    }
    pub fn progress_interval() -> usize {
        100
    }

    // Ranking defaults
    pub fn decay_exponent() -> f64 {
        1.5
    }
    pub fn min_age_secs() -> u64 {
        600
    }

    // Snapshot defaults
    pub fn snapshot_interval() -> u64 {
        1800
    }
    pub fn snapshot_version() -> u32 {
        1
    }
    pub fn local_dir() -> String {
        "storage".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_base_url() {
        let mut config = Config::default();
        config.api.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_cycle() {
        let mut config = Config::default();
        config.crawler.cycle_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_exponent() {
        let mut config = Config::default();
        config.ranking.decay_exponent = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            min_viewers = 5
            language = "en"
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.crawler.min_viewers, 5);
        assert_eq!(config.crawler.language.as_deref(), Some("en"));
        assert_eq!(config.crawler.cycle_secs, 300);
        assert_eq!(config.ranking.decay_exponent, 1.5);
    }
}
