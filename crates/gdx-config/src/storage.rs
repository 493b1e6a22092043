//! On-disk gem cache configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_root() -> PathBuf {
    PathBuf::from("tmp/gems")
}

/// Default time to wait for another worker's materialization of the same gem.
const fn default_lock_wait_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root of the gem cache. Archives land at `<root>/<name>/<version>.gem`.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Upper bound on waiting for a held per-version lock, in seconds.
    #[serde(default = "default_lock_wait_secs")]
    pub lock_wait_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            lock_wait_secs: default_lock_wait_secs(),
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub const fn lock_wait(&self) -> Duration {
        Duration::from_secs(self.lock_wait_secs)
    }

    /// Reject values that would make the cache unusable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty root path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.root".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = StorageConfig::default();
        assert_eq!(config.root, PathBuf::from("tmp/gems"));
        assert_eq!(config.lock_wait(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_root_is_rejected() {
        let config = StorageConfig {
            root: PathBuf::new(),
            ..StorageConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage.root"));
    }
}
