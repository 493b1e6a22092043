//! Resolution and acquisition: name → version → materialized [`GemSpec`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use gdx_config::GemdexConfig;
use gdx_registry::{Registry, RegistryClient, VersionEntry, VersionInfo, group_versions};
use tracing::Instrument;

use crate::analysis::{StaticAnalyzer, StructuralAnalyzer};
use crate::docs::{Sanitizer, TagStripper};
use crate::fetch::{FetchOutcome, GemFetcher};
use crate::lock::MaterializeLock;
use crate::samples::{InMemorySampleStore, TypeSampleStore};
use crate::spec::{Collaborators, GemSpec};
use crate::{GemError, GemLayout, unpack};

const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(300);
const DEFAULT_USER_AGENT: &str = "gemdex/0.1";

/// Entry point: resolves gems against a [`Registry`] and materializes them
/// under a cache root.
pub struct GemLibrary<R> {
    registry: R,
    root: PathBuf,
    fetcher: GemFetcher,
    lock_wait: Duration,
    collaborators: Collaborators,
}

impl GemLibrary<RegistryClient> {
    /// Library over the configured registry and cache root.
    #[must_use]
    pub fn from_config(config: &GemdexConfig) -> Self {
        let registry = RegistryClient::new(
            config.registry.base_url(),
            config.registry.timeout(),
            &config.registry.user_agent,
        );
        Self::new(registry, config.storage.root.clone())
            .with_fetcher(GemFetcher::new(
                config.registry.download_timeout(),
                &config.registry.user_agent,
            ))
            .with_lock_wait(config.storage.lock_wait())
    }
}

impl<R: Registry> GemLibrary<R> {
    /// Library with an empty analysis, no type samples and [`TagStripper`]
    /// sanitization.
    pub fn new(registry: R, root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            root: root.into(),
            fetcher: GemFetcher::new(DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_USER_AGENT),
            lock_wait: DEFAULT_LOCK_WAIT,
            collaborators: Collaborators {
                analyzer: Arc::new(StaticAnalyzer::default()),
                samples: Arc::new(InMemorySampleStore::default()),
                sanitizer: Arc::new(TagStripper),
            },
        }
    }

    #[must_use]
    pub fn with_fetcher(mut self, fetcher: GemFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    #[must_use]
    pub fn with_lock_wait(mut self, lock_wait: Duration) -> Self {
        self.lock_wait = lock_wait;
        self
    }

    #[must_use]
    pub fn with_analyzer(mut self, analyzer: impl StructuralAnalyzer + 'static) -> Self {
        self.collaborators.analyzer = Arc::new(analyzer);
        self
    }

    #[must_use]
    pub fn with_samples(mut self, samples: impl TypeSampleStore + 'static) -> Self {
        self.collaborators.samples = Arc::new(samples);
        self
    }

    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.collaborators.sanitizer = Arc::new(sanitizer);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Most recent version of `name`; `None` for a blank or unknown name.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Registry`] if the registry cannot be queried.
    pub async fn latest_version(&self, name: &str) -> Result<Option<String>, GemError> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        Ok(self.registry.latest_version(name).await?)
    }

    /// Resolve `name` at `version` (latest when `None`) and materialize it.
    ///
    /// Returns `Ok(None)` when the name is blank, no version resolves, or the
    /// registry has no info for the resolved version.
    ///
    /// # Errors
    ///
    /// Registry, transport, extraction and lock failures propagate; the call
    /// can be retried.
    pub async fn find(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Option<GemSpec>, GemError> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        let version = match version.filter(|v| !v.trim().is_empty()) {
            Some(version) => version.to_string(),
            None => match self.latest_version(name).await? {
                Some(latest) => latest,
                None => {
                    tracing::debug!(name, "no published version");
                    return Ok(None);
                }
            },
        };

        let Some(info) = self.registry.version_info(name, &version).await? else {
            tracing::debug!(name, %version, "registry has no info for version");
            return Ok(None);
        };
        self.materialize(info).await.map(Some)
    }

    /// Every published version of `name`, deduplicated by number.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Registry`] if the registry cannot be queried.
    pub async fn versions(&self, name: &str) -> Result<Vec<VersionEntry>, GemError> {
        if name.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.registry.list_versions(name).await?)
    }

    /// [`Self::versions`] grouped by `major.minor`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::versions`].
    pub async fn grouped_versions(
        &self,
        name: &str,
    ) -> Result<Vec<(String, Vec<VersionEntry>)>, GemError> {
        Ok(group_versions(&self.versions(name).await?))
    }

    /// Download and unpack `info` unless it is already materialized, then
    /// wrap it in a [`GemSpec`].
    ///
    /// At most one worker materializes a given (name, version) at a time;
    /// the others wait on its lock file and find the work done.
    ///
    /// # Errors
    ///
    /// Returns transport, extraction, lock and IO failures.
    pub async fn materialize(&self, info: VersionInfo) -> Result<GemSpec, GemError> {
        let layout = GemLayout::new(&self.root, &info.name, &info.version)?;
        let span = tracing::info_span!("gem", name = %info.name, version = %info.version);

        if layout.is_materialized() {
            tracing::debug!(parent: &span, "already materialized");
        } else {
            self.acquire(&layout, &info.gem_uri)
                .instrument(span.clone())
                .await?;
        }

        Ok(GemSpec::new(info, layout, self.collaborators.clone(), span))
    }

    async fn acquire(&self, layout: &GemLayout, gem_uri: &str) -> Result<(), GemError> {
        let _lock = MaterializeLock::acquire(&layout.lock_path(), self.lock_wait).await?;
        if layout.is_materialized() {
            tracing::debug!("materialized by another worker");
            return Ok(());
        }

        layout.ensure_download_dir()?;
        if let FetchOutcome::Cached = self.fetcher.fetch(gem_uri, &layout.archive_path()).await? {
            tracing::info!("archive present without finished unpack; unpacking again");
        }

        let blocking = layout.clone();
        let report = tokio::task::spawn_blocking(move || unpack::unpack(&blocking))
            .await
            .map_err(|e| GemError::extraction(layout.archive_path(), e))??;
        layout.mark_materialized()?;

        tracing::info!(files = report.data_files, "gem materialized");
        Ok(())
    }
}
