//! CLI configuration file.
//!
//! Settings are layered: `config.toml` first, then the environment, then
//! command-line flags.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use azdokit::config::{ENV_ORG_SERVICE_URL, ENV_PERSONAL_ACCESS_TOKEN};
use azdokit::{ProviderConfig, RefUpdateStrategy, RetryConfig};

/// Overrides the directory holding `config.toml`.
pub const ENV_CONFIG_DIR: &str = "AZDO_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("azdo"))
}

/// Get the config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

// ============================================================================
// File Config
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub org_service_url: Option<String>,
    pub personal_access_token: Option<String>,
    pub api_version: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout: Option<u64>,
    /// "in-place" or "replace"
    pub update_strategy: Option<String>,
    /// Poll interval for queued project operations, in milliseconds
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub retry: RetrySection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub backoff_factor: Option<f64>,
    pub max_delay_ms: Option<u64>,
}

impl FileConfig {
    /// Load `config.toml`; a missing file yields the defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid {}", path.display()))
    }

    fn retry(&self) -> RetryConfig {
        let defaults = RetryConfig::default();
        RetryConfig {
            max_attempts: self.retry.max_attempts.unwrap_or(defaults.max_attempts),
            base_delay: self
                .retry
                .base_delay_ms
                .map_or(defaults.base_delay, Duration::from_millis),
            backoff_factor: self.retry.backoff_factor.unwrap_or(defaults.backoff_factor),
            max_delay: self
                .retry
                .max_delay_ms
                .map_or(defaults.max_delay, Duration::from_millis),
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Command-line values that take precedence over file and environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub org_service_url: Option<String>,
    pub update_strategy: Option<RefUpdateStrategy>,
}

/// Values read from the environment
#[derive(Debug, Default)]
pub struct EnvValues {
    pub org_service_url: Option<String>,
    pub personal_access_token: Option<String>,
}

impl EnvValues {
    pub fn read() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            org_service_url: var(ENV_ORG_SERVICE_URL),
            personal_access_token: var(ENV_PERSONAL_ACCESS_TOKEN),
        }
    }
}

/// Build the provider config from file, environment and flags
pub fn resolve(file: &FileConfig, env: EnvValues, overrides: Overrides) -> Result<ProviderConfig> {
    let Some(url) = overrides
        .org_service_url
        .or(env.org_service_url)
        .or_else(|| file.org_service_url.clone())
    else {
        bail!("No organization URL: pass --org-url, set {ENV_ORG_SERVICE_URL} or add org_service_url to {CONFIG_FILE}");
    };
    let Some(token) = env
        .personal_access_token
        .or_else(|| file.personal_access_token.clone())
    else {
        bail!("No personal access token: set {ENV_PERSONAL_ACCESS_TOKEN} or add personal_access_token to {CONFIG_FILE}");
    };

    let file_strategy = file
        .update_strategy
        .as_deref()
        .map(str::parse::<RefUpdateStrategy>)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let mut config = ProviderConfig::new(url, token).with_retry(file.retry());
    if let Some(version) = &file.api_version {
        config.api_version.clone_from(version);
    }
    if let Some(secs) = file.request_timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(ms) = file.poll_interval_ms {
        config = config.with_poll_interval(Duration::from_millis(ms));
    }
    if let Some(strategy) = overrides.update_strategy.or(file_strategy) {
        config = config.with_update_strategy(strategy);
    }

    config.validate()?;
    Ok(config)
}
