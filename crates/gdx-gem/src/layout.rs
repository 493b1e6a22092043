//! Deterministic on-disk layout for one (name, version).
//!
//! ```text
//! <root>/<name>/<version>.gem          raw archive (present only when fully downloaded)
//! <root>/<name>/<version>.gem.part     in-flight download
//! <root>/<name>/<version>.lock         per-version materialization lock
//! <root>/<name>/<version>/             unpack root
//!     data.tar.gz, metadata            outer archive members (metadata gunzipped in place)
//!     data/                            unpacked payload
//!     <name>_<true|false>.rbs          cached signatures
//!     .complete                        written last; marks a finished unpack
//! ```
//!
//! The layout is the cache: nothing else records what has been fetched.

use std::fs;
use std::path::{Path, PathBuf};

use crate::GemError;

const ARCHIVE_EXT: &str = "gem";
const SENTINEL: &str = ".complete";
const DATA_DIR: &str = "data";
const DATA_ARCHIVE: &str = "data.tar.gz";
const METADATA_ARCHIVE: &str = "metadata.gz";
const METADATA_FILE: &str = "metadata";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GemLayout {
    root: PathBuf,
    name: String,
    version: String,
}

impl GemLayout {
    /// Layout for `name`/`version` under `root`. Nothing is created on disk.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::InvalidComponent`] if either value is not a single,
    /// non-empty path segment.
    pub fn new(root: impl Into<PathBuf>, name: &str, version: &str) -> Result<Self, GemError> {
        validate_component("name", name)?;
        validate_component("version", version)?;
        Ok(Self {
            root: root.into(),
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn download_dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.download_dir()
            .join(format!("{}.{ARCHIVE_EXT}", self.version))
    }

    #[must_use]
    pub fn partial_archive_path(&self) -> PathBuf {
        self.download_dir()
            .join(format!("{}.{ARCHIVE_EXT}.part", self.version))
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.download_dir().join(format!("{}.lock", self.version))
    }

    #[must_use]
    pub fn unpack_dir(&self) -> PathBuf {
        self.download_dir().join(&self.version)
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.unpack_dir().join(DATA_DIR)
    }

    #[must_use]
    pub fn data_archive(&self) -> PathBuf {
        self.unpack_dir().join(DATA_ARCHIVE)
    }

    #[must_use]
    pub fn metadata_archive(&self) -> PathBuf {
        self.unpack_dir().join(METADATA_ARCHIVE)
    }

    #[must_use]
    pub fn metadata_file(&self) -> PathBuf {
        self.unpack_dir().join(METADATA_FILE)
    }

    #[must_use]
    pub fn sentinel_path(&self) -> PathBuf {
        self.unpack_dir().join(SENTINEL)
    }

    /// Cached signature file. Distinct per `require_samples` so both
    /// renderings can coexist.
    #[must_use]
    pub fn rbs_file_path(&self, require_samples: bool) -> PathBuf {
        self.unpack_dir()
            .join(format!("{}_{require_samples}.rbs", self.name))
    }

    /// The archive finished downloading (partial downloads live elsewhere).
    #[must_use]
    pub fn is_downloaded(&self) -> bool {
        self.archive_path().is_file()
    }

    /// Download and unpack both completed.
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.is_downloaded() && self.sentinel_path().is_file()
    }

    /// Create the download directory.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Io`] if the directory cannot be created.
    pub fn ensure_download_dir(&self) -> Result<PathBuf, GemError> {
        let dir = self.download_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Remove any previous unpack attempt and recreate an empty unpack root
    /// with its `data/` directory.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Io`] on filesystem failures.
    pub fn reset_unpack_dir(&self) -> Result<(), GemError> {
        let dir = self.unpack_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(self.data_dir())?;
        Ok(())
    }

    /// Record that unpacking finished.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Io`] if the sentinel cannot be written.
    pub fn mark_materialized(&self) -> Result<(), GemError> {
        fs::write(self.sentinel_path(), self.version.as_bytes())?;
        Ok(())
    }

    /// Path of `relative` inside the unpacked payload.
    #[must_use]
    pub fn data_file(&self, relative: &str) -> PathBuf {
        self.data_dir().join(Path::new(relative))
    }
}

fn validate_component(field: &'static str, value: &str) -> Result<(), GemError> {
    let invalid = value.trim().is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(GemError::InvalidComponent {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
