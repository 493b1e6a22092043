//! Recorded runtime type observations.
//!
//! Each [`TypeSample`] is one observation of a method call: the receiver, the
//! method, and the types seen for its arguments and return value. Stores are
//! queried by gem name and version prefix; grouping and counting happen in
//! the coverage module.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::GemError;

/// One positional argument's observed type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSample {
    pub gem_name: String,
    /// Version the observation was recorded against (e.g. `2.0.0-x86_64-linux`).
    pub gem_version: String,
    /// Qualified name of the receiving namespace.
    pub receiver: String,
    pub method_name: String,
    #[serde(default)]
    pub parameters: Vec<SampleParameter>,
    #[serde(default)]
    pub return_type: Option<String>,
}

impl TypeSample {
    /// Whether this observation was recorded for `gem_name` at a version
    /// starting with `version_prefix`.
    #[must_use]
    pub fn matches(&self, gem_name: &str, version_prefix: &str) -> bool {
        self.gem_name == gem_name && self.gem_version.starts_with(version_prefix)
    }
}

/// Version prefix samples are matched against: `version` up to its first `-`.
///
/// `2.0.0-x86_64-linux` and `2.0.0` both match samples recorded for any
/// platform build of 2.0.0.
#[must_use]
pub fn version_prefix(version: &str) -> &str {
    version.split('-').next().unwrap_or(version)
}

/// Source of recorded observations.
pub trait TypeSampleStore: Send + Sync {
    /// All observations for `gem_name` whose version starts with
    /// `version_prefix`, one entry per observation.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Samples`] if the store cannot be read.
    fn samples(&self, gem_name: &str, version_prefix: &str) -> Result<Vec<TypeSample>, GemError>;
}

/// Observations held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySampleStore {
    samples: Vec<TypeSample>,
}

impl InMemorySampleStore {
    #[must_use]
    pub fn new(samples: Vec<TypeSample>) -> Self {
        Self { samples }
    }

    pub fn push(&mut self, sample: TypeSample) {
        self.samples.push(sample);
    }
}

impl TypeSampleStore for InMemorySampleStore {
    fn samples(&self, gem_name: &str, version_prefix: &str) -> Result<Vec<TypeSample>, GemError> {
        Ok(self
            .samples
            .iter()
            .filter(|s| s.matches(gem_name, version_prefix))
            .cloned()
            .collect())
    }
}

/// Observations stored one JSON object per line.
///
/// A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct JsonlSampleStore {
    path: PathBuf,
}

impl JsonlSampleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append observations to the store file, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Samples`] if the file cannot be written.
    pub fn append<'a>(
        &self,
        samples: impl IntoIterator<Item = &'a TypeSample>,
    ) -> Result<(), GemError> {
        serde_jsonlines::append_json_lines(&self.path, samples).map_err(|e| {
            GemError::Samples(format!("failed to append to {}: {e}", self.path.display()))
        })
    }
}

impl TypeSampleStore for JsonlSampleStore {
    fn samples(&self, gem_name: &str, version_prefix: &str) -> Result<Vec<TypeSample>, GemError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let lines = serde_jsonlines::json_lines::<TypeSample, _>(&self.path).map_err(|e| {
            GemError::Samples(format!("failed to open {}: {e}", self.path.display()))
        })?;

        let mut matching = Vec::new();
        for (index, line) in lines.enumerate() {
            let sample = line.map_err(|e| {
                GemError::Samples(format!(
                    "{} line {}: {e}",
                    self.path.display(),
                    index + 1
                ))
            })?;
            if sample.matches(gem_name, version_prefix) {
                matching.push(sample);
            }
        }
        Ok(matching)
    }
}
