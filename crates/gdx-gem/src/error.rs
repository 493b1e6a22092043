//! Gem pipeline error types.

use std::fmt;
use std::path::PathBuf;

use gdx_registry::RegistryError;

/// Which kind of constant a strict lookup was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    Class,
    Module,
    Namespace,
}

impl fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class => f.write_str("class"),
            Self::Module => f.write_str("module"),
            Self::Namespace => f.write_str("namespace"),
        }
    }
}

/// Errors raised while resolving, acquiring, or querying a gem.
///
/// Absent gems are not errors: lookups return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum GemError {
    /// The registry could not be queried.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The archive request failed before or while streaming.
    #[error("failed to download {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The archive download exceeded its time budget.
    #[error("download of {url} timed out")]
    Timeout { url: String },

    /// The archive host answered with a non-success status.
    #[error("download of {url} failed with HTTP {status}")]
    DownloadStatus { url: String, status: u16 },

    /// The outer archive or one of its nested parts could not be unpacked.
    #[error("failed to extract {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A gem name or version cannot be used as a single path segment.
    #[error("invalid gem {field} {value:?}")]
    InvalidComponent { field: &'static str, value: String },

    /// Strict lookup miss.
    #[error("Couldn't find {kind} '{name}'")]
    ConstantNotFound { kind: ConstantKind, name: String },

    /// Another worker held the per-version lock for too long.
    #[error("timed out waiting for lock {}", path.display())]
    LockTimeout { path: PathBuf },

    /// The structural analyzer failed.
    #[error("analyzer error: {0}")]
    Analyzer(String),

    /// The type sample store failed.
    #[error("type sample store error: {0}")]
    Samples(String),
}

impl GemError {
    /// Whether re-running the acquisition pipeline may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Registry(err) => err.is_retryable(),
            Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::Extraction { .. }
            | Self::LockTimeout { .. }
            | Self::Io(_) => true,
            Self::DownloadStatus { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidComponent { .. }
            | Self::ConstantNotFound { .. }
            | Self::Analyzer(_)
            | Self::Samples(_) => false,
        }
    }

    pub(crate) fn extraction(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::Extraction {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}
