//! # gdx-registry
//!
//! Gem registry HTTP client for gemdex.
//!
//! Resolves gem names to published versions and per-version descriptive info
//! via the rubygems.org API (or any compatible mirror):
//! - `GET /api/v1/versions/{name}/latest.json`: latest version number
//! - `GET /api/v2/rubygems/{name}/versions/{version}.json`: version info
//! - `GET /api/v1/versions/{name}.json`: all published versions
//!
//! Absent gems and versions are `Ok(None)` / empty, never errors.

mod error;
mod http;
mod rubygems;
mod versions;

pub use error::RegistryError;
pub use versions::{dedupe_versions, group_versions, minor_series};

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ── Types ──────────────────────────────────────────────────────────

/// Descriptive info for one published version of a gem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Gem name (e.g., `rails`).
    pub name: String,
    /// Exact version string (e.g., `8.0.2`, `1.16.0-x86_64-linux`).
    pub version: String,
    /// One-line summary, empty if the gem has none.
    pub summary: String,
    /// Long description, empty if the gem has none.
    pub description: String,
    /// When this version was pushed to the registry.
    pub version_created_at: DateTime<Utc>,
    /// Total download count reported by the registry.
    pub downloads: u64,
    /// Download URI of the `.gem` archive.
    pub gem_uri: String,
}

impl VersionInfo {
    /// Calendar date this version was released.
    #[must_use]
    pub fn released_at(&self) -> NaiveDate {
        self.version_created_at.date_naive()
    }
}

/// One row of a gem's version listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Version number (e.g., `7.1.3`).
    pub number: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub downloads_count: u64,
    /// Platform the archive was built for (`ruby` for pure gems).
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub prerelease: bool,
}

fn default_platform() -> String {
    "ruby".to_string()
}

// ── Registry ───────────────────────────────────────────────────────

/// Source of version listings and per-version info.
///
/// Implemented by [`RegistryClient`] for the real registry; tests and
/// offline tools provide their own implementations.
pub trait Registry: Send + Sync {
    /// Most recently published version of `name`, or `None` if the name is
    /// blank or unknown to the registry.
    fn latest_version(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, RegistryError>> + Send;

    /// Info for `name` at exactly `version`, or `None` if either is unknown.
    fn version_info(
        &self,
        name: &str,
        version: &str,
    ) -> impl Future<Output = Result<Option<VersionInfo>, RegistryError>> + Send;

    /// All published versions of `name`, newest first, deduplicated by number.
    fn list_versions(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<VersionEntry>, RegistryError>> + Send;
}

// ── Client ─────────────────────────────────────────────────────────

/// Default registry host.
pub const RUBYGEMS_URL: &str = "https://rubygems.org";

/// HTTP client for the rubygems.org API.
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new(RUBYGEMS_URL, Duration::from_secs(10), "gemdex/0.1")
    }
}

impl RegistryClient {
    /// Create a client against `base_url` (e.g., a local mirror).
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` fails to build.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration, user_agent: &str) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()
                .expect("reqwest client should build"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL requests are issued against, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
