//! Configuration loading
//!
//! Loads configuration from `~/.config/remove-dup/config.toml` (or the
//! `REMOVE_DUP_CONFIG` env var). Every field has a default, so an absent file
//! is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{DedupError, Result};
use crate::policy::Policy;

/// Root configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DedupConfig {
    /// Importance policy used to build each report's signature
    #[serde(default)]
    pub policy: Policy,

    /// Concurrent parse workers (0 = available parallelism)
    #[serde(default)]
    pub jobs: usize,

    /// Abort the run on the first report that cannot be parsed
    #[serde(default)]
    pub fail_fast: bool,

    /// Upper bound on a single report parse
    #[serde(default = "default_parse_timeout_secs")]
    pub parse_timeout_secs: u64,

    /// Index page settings
    #[serde(default)]
    pub index: IndexConfig,
}

fn default_parse_timeout_secs() -> u64 {
    120
}

/// Index page configuration
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Write `index.html` next to the surviving reports
    #[serde(default = "default_index_enabled")]
    pub enabled: bool,

    /// Page heading and `<title>`
    #[serde(default = "default_index_title")]
    pub title: String,

    /// Row order of the report table
    #[serde(default)]
    pub order: IndexOrder,
}

fn default_index_enabled() -> bool {
    true
}

fn default_index_title() -> String {
    "Static Analysis Results".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: default_index_enabled(),
            title: default_index_title(),
            order: IndexOrder::default(),
        }
    }
}

/// Presentation order of surviving reports. Deduplication itself never
/// depends on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexOrder {
    #[default]
    BugType,
    Category,
    Path,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            jobs: 0,
            fail_fast: false,
            parse_timeout_secs: default_parse_timeout_secs(),
            index: IndexConfig::default(),
        }
    }
}

impl DedupConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "REMOVE_DUP_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "config.toml";

    /// Load configuration from file
    ///
    /// Resolution order:
    /// 1. `REMOVE_DUP_CONFIG` environment variable
    /// 2. `~/.config/remove-dup/config.toml`
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let path = Self::resolve_config_path();

        if !path.exists() {
            tracing::info!(
                path = %path.display(),
                "config not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DedupError::config_with_source(
                format!("failed to read config at {}", path.display()),
                e,
            )
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: DedupConfig = toml::from_str(contents)
            .map_err(|e| DedupError::config_with_source("failed to parse config", e))?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|h| {
                h.join(".config")
                    .join("remove-dup")
                    .join(Self::DEFAULT_CONFIG_FILENAME)
            })
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    pub fn validate(&self) -> Result<()> {
        if self.parse_timeout_secs == 0 {
            return Err(DedupError::config("parse_timeout_secs must be positive"));
        }

        if self.index.enabled && self.index.title.trim().is_empty() {
            tracing::warn!("index title is empty; the generated page will have no heading");
        }

        Ok(())
    }

    pub fn parse_timeout(&self) -> Duration {
        Duration::from_secs(self.parse_timeout_secs)
    }

    /// Worker count with `0` resolved to the machine's parallelism.
    pub fn resolved_jobs(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let cfg = DedupConfig::default();
        assert_eq!(cfg.policy, Policy::Conservative);
        assert_eq!(cfg.parse_timeout(), Duration::from_secs(120));
        assert!(!cfg.fail_fast);
        assert!(cfg.index.enabled);
        assert_eq!(cfg.index.order, IndexOrder::BugType);
        assert!(cfg.resolved_jobs() >= 1);
    }

    #[test]
    fn test_parse_minimal_config() {
        let cfg = DedupConfig::parse("policy = \"aggressive\"").expect("should parse");
        assert_eq!(cfg.policy, Policy::Aggressive);
        assert_eq!(cfg.parse_timeout_secs, 120);
        assert_eq!(cfg.index.title, "Static Analysis Results");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            policy = "conservative"
            jobs = 3
            fail_fast = true
            parse_timeout_secs = 10

            [index]
            enabled = false
            title = "Nightly scan"
            order = "category"
        "#;

        let cfg = DedupConfig::parse(toml).expect("should parse");
        assert_eq!(cfg.resolved_jobs(), 3);
        assert!(cfg.fail_fast);
        assert_eq!(cfg.parse_timeout(), Duration::from_secs(10));
        assert!(!cfg.index.enabled);
        assert_eq!(cfg.index.title, "Nightly scan");
        assert_eq!(cfg.index.order, IndexOrder::Category);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = DedupConfig::parse("parse_timeout_secs = 0").expect_err("zero timeout");
        assert!(err.to_string().contains("parse_timeout_secs"));
    }

    #[test]
    fn test_rejects_unknown_policy() {
        assert!(DedupConfig::parse("policy = \"lenient\"").is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "jobs = 2\n").expect("write config");
        let cfg = DedupConfig::load_from_path(&path).expect("should load");
        assert_eq!(cfg.jobs, 2);

        let missing = DedupConfig::load_from_path(&dir.path().join("nope.toml"));
        assert!(missing.is_err());
    }
}
