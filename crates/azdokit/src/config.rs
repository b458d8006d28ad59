//! Provider configuration.
//!
//! A [`ProviderConfig`] is resolved once (usually from the environment) and
//! handed to [`crate::Client::new`] by value. Nothing below the client reads
//! the environment.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable holding the organization URL.
pub const ENV_ORG_SERVICE_URL: &str = "AZDO_ORG_SERVICE_URL";

/// Environment variable holding the personal access token.
pub const ENV_PERSONAL_ACCESS_TOKEN: &str = "AZDO_PERSONAL_ACCESS_TOKEN";

/// REST API version sent with every request.
pub const DEFAULT_API_VERSION: &str = "7.1";

/// How a branch reacts when only its ref source changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefUpdateStrategy {
    /// Re-resolve the ref and move the branch to the new commit.
    #[default]
    InPlace,
    /// Delete the branch and create it again from the new ref.
    Replace,
}

impl RefUpdateStrategy {
    /// Display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InPlace => "in-place",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for RefUpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefUpdateStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "in-place" | "inplace" => Ok(Self::InPlace),
            "replace" => Ok(Self::Replace),
            other => Err(format!(
                "unknown ref update strategy '{other}' (expected in-place or replace)"
            )),
        }
    }
}

/// Connection settings for one Azure DevOps organization.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Organization URL, e.g. `https://dev.azure.com/contoso`.
    pub org_service_url: String,
    /// Personal access token.
    pub personal_access_token: String,
    /// REST API version.
    pub api_version: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
    /// Behavior for ref-only branch changes.
    pub update_strategy: RefUpdateStrategy,
    /// Delay between polls of queued operations.
    pub operation_poll_interval: Duration,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("org_service_url", &self.org_service_url)
            .field("personal_access_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .field("update_strategy", &self.update_strategy)
            .field("operation_poll_interval", &self.operation_poll_interval)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a config with default settings.
    pub fn new(org_service_url: impl Into<String>, personal_access_token: impl Into<String>) -> Self {
        Self {
            org_service_url: org_service_url.into(),
            personal_access_token: personal_access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout: Duration::from_secs(60),
            retry: RetryConfig::default(),
            update_strategy: RefUpdateStrategy::default(),
            operation_poll_interval: Duration::from_secs(2),
        }
    }

    /// Read the organization URL and token from the environment.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(ENV_ORG_SERVICE_URL)
            .map_err(|_| Error::Config(format!("{ENV_ORG_SERVICE_URL} is not set")))?;
        let token = std::env::var(ENV_PERSONAL_ACCESS_TOKEN)
            .map_err(|_| Error::Config(format!("{ENV_PERSONAL_ACCESS_TOKEN} is not set")))?;
        let config = Self::new(url, token);
        config.validate()?;
        Ok(config)
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the ref update strategy.
    pub fn with_update_strategy(mut self, strategy: RefUpdateStrategy) -> Self {
        self.update_strategy = strategy;
        self
    }

    /// Set the queued operation poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.operation_poll_interval = interval;
        self
    }

    /// Reject configurations that cannot work.
    pub fn validate(&self) -> Result<()> {
        let url = self.org_service_url.trim();
        if url.is_empty() {
            return Err(Error::Config("organization URL is empty".to_string()));
        }
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(Error::Config(format!(
                "organization URL must start with http:// or https://: {url}"
            )));
        }
        if self.personal_access_token.trim().is_empty() {
            return Err(Error::Config("personal access token is empty".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Organization URL without a trailing slash.
    pub fn organization_url(&self) -> &str {
        self.org_service_url.trim().trim_end_matches('/')
    }

    /// Organization name: the last path segment of the URL.
    pub fn organization_name(&self) -> Option<&str> {
        let url = self.organization_url();
        let path = url.split_once("://").map_or(url, |(_, rest)| rest);
        let (_, name) = path.rsplit_once('/')?;
        (!name.is_empty()).then_some(name)
    }
}
