use anyhow::Context;
use gdx_config::GemdexConfig;
use gdx_gem::GemLibrary;
use gdx_registry::RegistryClient;

use crate::cli::GlobalFlags;

/// Load layered configuration (with `.env`) and apply CLI overrides.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<GemdexConfig> {
    let mut config =
        GemdexConfig::load_with_dotenv().context("failed to load gemdex configuration")?;
    if let Some(cache_dir) = &flags.cache_dir {
        config.storage.root.clone_from(cache_dir);
    }
    tracing::debug!(root = %config.storage.root.display(), "gem cache root");
    Ok(config)
}

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub config: GemdexConfig,
}

impl AppContext {
    #[must_use]
    pub const fn new(config: GemdexConfig) -> Self {
        Self { config }
    }

    /// A library over the configured registry and cache root. Commands layer
    /// their own analyzer and sample store on top.
    #[must_use]
    pub fn library(&self) -> GemLibrary<RegistryClient> {
        GemLibrary::from_config(&self.config)
    }

    #[must_use]
    pub fn default_limit(&self) -> u32 {
        self.config.general.default_limit
    }
}
