//! RubyGems registry endpoint configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_base_url() -> String {
    "https://rubygems.org".to_string()
}

/// Default timeout for registry API calls, in seconds.
const fn default_timeout_secs() -> u64 {
    10
}

/// Default timeout for a whole archive download, in seconds.
const fn default_download_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!("gemdex/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Registry base URL, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for version listing and version info requests.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for streaming a `.gem` archive to disk.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Base URL with any trailing slashes removed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Check the section for values the HTTP clients cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a blank base URL or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(invalid("registry.base_url", "must not be blank"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("registry.timeout_secs", "must be greater than zero"));
        }
        if self.download_timeout_secs == 0 {
            return Err(invalid(
                "registry.download_timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
