//! rubygems.org API endpoints.

use chrono::{DateTime, Utc};

use crate::http::check_optional;
use crate::versions::dedupe_versions;
use crate::{Registry, RegistryClient, RegistryError, VersionEntry, VersionInfo};

/// `latest.json` answers `"unknown"` instead of 404 for missing gems.
const UNKNOWN_VERSION: &str = "unknown";

#[derive(serde::Deserialize)]
struct LatestVersion {
    version: String,
}

#[derive(serde::Deserialize)]
struct RubyGemVersion {
    name: String,
    version: String,
    summary: Option<String>,
    description: Option<String>,
    version_created_at: DateTime<Utc>,
    #[serde(default)]
    downloads: u64,
    gem_uri: String,
}

impl From<RubyGemVersion> for VersionInfo {
    fn from(v: RubyGemVersion) -> Self {
        Self {
            name: v.name,
            version: v.version,
            summary: v.summary.unwrap_or_default(),
            description: v.description.unwrap_or_default(),
            version_created_at: v.version_created_at,
            downloads: v.downloads,
            gem_uri: v.gem_uri,
        }
    }
}

impl RegistryClient {
    fn latest_url(&self, name: &str) -> String {
        format!(
            "{}/api/v1/versions/{}/latest.json",
            self.base_url,
            urlencoding::encode(name)
        )
    }

    fn version_info_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/api/v2/rubygems/{}/versions/{}.json",
            self.base_url,
            urlencoding::encode(name),
            urlencoding::encode(version)
        )
    }

    fn versions_url(&self, name: &str) -> String {
        format!(
            "{}/api/v1/versions/{}.json",
            self.base_url,
            urlencoding::encode(name)
        )
    }
}

impl Registry for RegistryClient {
    async fn latest_version(&self, name: &str) -> Result<Option<String>, RegistryError> {
        if name.trim().is_empty() {
            return Ok(None);
        }

        let url = self.latest_url(name);
        let Some(resp) = check_optional(self.http.get(&url).send().await?).await? else {
            return Ok(None);
        };

        let latest: LatestVersion = resp.json().await?;
        if latest.version.is_empty() || latest.version == UNKNOWN_VERSION {
            tracing::debug!(gem = name, "registry has no published version");
            return Ok(None);
        }
        Ok(Some(latest.version))
    }

    async fn version_info(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Option<VersionInfo>, RegistryError> {
        if name.trim().is_empty() || version.trim().is_empty() {
            return Ok(None);
        }

        let url = self.version_info_url(name, version);
        let Some(resp) = check_optional(self.http.get(&url).send().await?).await? else {
            tracing::debug!(gem = name, version, "registry has no such version");
            return Ok(None);
        };

        let body = resp.text().await?;
        let data: RubyGemVersion =
            serde_json::from_str(&body).map_err(|e| RegistryError::Parse(e.to_string()))?;
        Ok(Some(data.into()))
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<VersionEntry>, RegistryError> {
        if name.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = self.versions_url(name);
        let Some(resp) = check_optional(self.http.get(&url).send().await?).await? else {
            return Ok(Vec::new());
        };

        let body = resp.text().await?;
        let entries: Vec<VersionEntry> =
            serde_json::from_str(&body).map_err(|e| RegistryError::Parse(e.to_string()))?;
        Ok(dedupe_versions(entries))
    }
}
