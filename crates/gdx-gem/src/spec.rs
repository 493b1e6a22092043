//! [`GemSpec`]: the query surface over one materialized gem version.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;
use gdx_registry::VersionInfo;
use tracing::Span;

use crate::analysis::{Analysis, MethodSpec, Namespace, SourceTree, StructuralAnalyzer};
use crate::coverage::{self, SampledMethod};
use crate::docs::{self, FileKind, Sanitizer};
use crate::error::ConstantKind;
use crate::metadata::{Metadata, MetadataCodec};
use crate::samples::{TypeSample, TypeSampleStore, version_prefix};
use crate::signature;
use crate::{GemError, GemLayout};

/// Injected collaborators shared by every [`GemSpec`] a library produces.
#[derive(Clone)]
pub(crate) struct Collaborators {
    pub(crate) analyzer: Arc<dyn StructuralAnalyzer>,
    pub(crate) samples: Arc<dyn TypeSampleStore>,
    pub(crate) sanitizer: Arc<dyn Sanitizer>,
}

/// A gem version whose archive is downloaded and unpacked.
///
/// Metadata and analysis are computed on first use and kept for the life of
/// the value. A failed computation keeps the empty fallback, not the error.
pub struct GemSpec {
    info: VersionInfo,
    layout: GemLayout,
    collaborators: Collaborators,
    span: Span,
    metadata: OnceLock<Metadata>,
    analysis: OnceLock<Analysis>,
}

impl fmt::Debug for GemSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GemSpec")
            .field("name", &self.info.name)
            .field("version", &self.info.version)
            .field("unpack_dir", &self.layout.unpack_dir())
            .finish_non_exhaustive()
    }
}

impl GemSpec {
    pub(crate) fn new(
        info: VersionInfo,
        layout: GemLayout,
        collaborators: Collaborators,
        span: Span,
    ) -> Self {
        Self {
            info,
            layout,
            collaborators,
            span,
            metadata: OnceLock::new(),
            analysis: OnceLock::new(),
        }
    }

    // ── Descriptive info ───────────────────────────────────────────

    #[must_use]
    pub fn info(&self) -> &VersionInfo {
        &self.info
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.info.version
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.info.summary
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.info.description
    }

    #[must_use]
    pub fn released_at(&self) -> NaiveDate {
        self.info.released_at()
    }

    #[must_use]
    pub fn downloads(&self) -> u64 {
        self.info.downloads
    }

    #[must_use]
    pub fn gem_uri(&self) -> &str {
        &self.info.gem_uri
    }

    #[must_use]
    pub fn layout(&self) -> &GemLayout {
        &self.layout
    }

    // ── Lazy slots ─────────────────────────────────────────────────

    /// Decoded manifest; empty if it was unreadable or untrusted.
    pub fn metadata(&self) -> &Metadata {
        self.metadata
            .get_or_init(|| MetadataCodec.load(&self.layout.metadata_file(), &self.span))
    }

    /// Normalized analyzer output; empty if the analyzer failed.
    pub fn analysis(&self) -> &Analysis {
        self.analysis.get_or_init(|| {
            let files = self.files();
            let data_dir = self.layout.data_dir();
            let tree = SourceTree {
                name: self.name(),
                version: self.version(),
                root: &data_dir,
                files: &files,
            };
            match self.collaborators.analyzer.analyze(&tree) {
                Ok(analysis) => analysis.normalize(),
                Err(error) => {
                    tracing::warn!(parent: &self.span, %error, "analysis failed; using empty analysis");
                    Analysis::default()
                }
            }
        })
    }

    // ── Structure ──────────────────────────────────────────────────

    /// Classes, sorted by qualified name.
    pub fn classes(&self) -> &[Namespace] {
        &self.analysis().classes
    }

    /// Modules, sorted by qualified name.
    pub fn modules(&self) -> &[Namespace] {
        &self.analysis().modules
    }

    /// Classes followed by modules.
    pub fn namespaces(&self) -> Vec<&Namespace> {
        self.analysis().namespaces().collect()
    }

    /// Top-level instance methods, sorted by name.
    pub fn instance_methods(&self) -> &[MethodSpec] {
        &self.analysis().instance_methods
    }

    /// Top-level class methods, sorted by name.
    pub fn class_methods(&self) -> &[MethodSpec] {
        &self.analysis().class_methods
    }

    /// Instance methods followed by class methods.
    pub fn methods(&self) -> Vec<&MethodSpec> {
        self.instance_methods()
            .iter()
            .chain(self.class_methods())
            .collect()
    }

    pub fn top_level_classes(&self) -> Vec<&Namespace> {
        self.classes().iter().filter(|c| c.is_top_level()).collect()
    }

    pub fn top_level_modules(&self) -> Vec<&Namespace> {
        self.modules().iter().filter(|m| m.is_top_level()).collect()
    }

    /// The root constant most namespaces live under, or the capitalized gem
    /// name if there are none. Ties go to the constant seen first.
    pub fn most_used_constant(&self) -> String {
        most_used_root(self.analysis().namespaces())
            .map_or_else(|| capitalize(self.name()), str::to_string)
    }

    pub fn find_class(&self, qualified_name: &str) -> Option<&Namespace> {
        self.analysis().find_class(qualified_name)
    }

    pub fn find_module(&self, qualified_name: &str) -> Option<&Namespace> {
        self.analysis().find_module(qualified_name)
    }

    /// Module named `qualified_name`, else the class of that name.
    pub fn find_namespace(&self, qualified_name: &str) -> Option<&Namespace> {
        self.analysis().find_namespace(qualified_name)
    }

    /// # Errors
    ///
    /// Returns [`GemError::ConstantNotFound`] carrying `qualified_name`.
    pub fn require_class(&self, qualified_name: &str) -> Result<&Namespace, GemError> {
        self.find_class(qualified_name)
            .ok_or_else(|| not_found(ConstantKind::Class, qualified_name))
    }

    /// # Errors
    ///
    /// Returns [`GemError::ConstantNotFound`] carrying `qualified_name`.
    pub fn require_module(&self, qualified_name: &str) -> Result<&Namespace, GemError> {
        self.find_module(qualified_name)
            .ok_or_else(|| not_found(ConstantKind::Module, qualified_name))
    }

    /// # Errors
    ///
    /// Returns [`GemError::ConstantNotFound`] carrying `qualified_name`.
    pub fn require_namespace(&self, qualified_name: &str) -> Result<&Namespace, GemError> {
        self.find_namespace(qualified_name)
            .ok_or_else(|| not_found(ConstantKind::Namespace, qualified_name))
    }

    // ── Coverage ───────────────────────────────────────────────────

    /// Observations recorded for this gem at this version's prefix.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Samples`] if the store cannot be read.
    pub fn samples(&self) -> Result<Vec<TypeSample>, GemError> {
        self.collaborators
            .samples
            .samples(self.name(), version_prefix(self.version()))
    }

    /// Resolvable (namespace, method, count) triples.
    ///
    /// # Errors
    ///
    /// Same as [`Self::samples`].
    pub fn type_sampled_methods(&self) -> Result<Vec<SampledMethod>, GemError> {
        Ok(coverage::sampled_methods(self.analysis(), &self.samples()?))
    }

    /// # Errors
    ///
    /// Same as [`Self::samples`].
    pub fn type_sampled_methods_count(&self) -> Result<usize, GemError> {
        Ok(self.type_sampled_methods()?.len())
    }

    /// Top-level methods plus the methods of every namespace.
    pub fn methods_count(&self) -> usize {
        self.analysis().methods_count()
    }

    /// Percentage of methods with at least one resolvable observation.
    ///
    /// # Errors
    ///
    /// Same as [`Self::samples`].
    pub fn typing_progress(&self) -> Result<f64, GemError> {
        let covered = self.type_sampled_methods_count()?;
        let progress = coverage::typing_progress(covered, self.methods_count());
        tracing::debug!(parent: &self.span, covered, progress, "typing progress");
        Ok(progress)
    }

    // ── Signatures ─────────────────────────────────────────────────

    /// RBS for every namespace, cached in the unpack directory per
    /// `require_samples`.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Io`] if the cache cannot be read or written and
    /// [`GemError::Samples`] if observations cannot be loaded.
    pub fn rbs_signature(&self, require_samples: bool) -> Result<String, GemError> {
        let _entered = self.span.enter();
        signature::cached_or_render(&self.layout.rbs_file_path(require_samples), || {
            let samples = self.samples()?;
            Ok(signature::render_signatures(
                self.analysis().namespaces(),
                &samples,
                require_samples,
            ))
        })
    }

    // ── Documentation ──────────────────────────────────────────────

    pub fn files_of(&self, kind: FileKind) -> Vec<String> {
        docs::classify(&self.metadata().files, kind)
    }

    /// Library source files.
    pub fn files(&self) -> Vec<String> {
        self.files_of(FileKind::Source)
    }

    pub fn markdown_files(&self) -> Vec<String> {
        self.files_of(FileKind::Markdown)
    }

    pub fn documentation_files(&self) -> Vec<String> {
        self.files_of(FileKind::Docs)
    }

    pub fn guide_files(&self) -> Vec<String> {
        self.files_of(FileKind::Guides)
    }

    pub fn rbs_files(&self) -> Vec<String> {
        self.files_of(FileKind::Rbs)
    }

    pub fn readme(&self) -> Option<String> {
        docs::readme(&self.markdown_files()).map(str::to_string)
    }

    /// Sanitized readme, or [`docs::NO_README`] if there is none or its
    /// manifest path points outside the payload.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Io`] if the manifest lists a readme that is not
    /// on disk.
    pub fn readme_content(&self) -> Result<String, GemError> {
        let content = match self.readme() {
            Some(readme) => self.read_data_file(&readme)?,
            None => None,
        };
        Ok(content.unwrap_or_else(|| docs::NO_README.to_string()))
    }

    /// Sanitized content of `<file>.md`, or a not-found placeholder if the
    /// gem ships no such markdown file inside its payload.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Io`] if the manifest lists the file but it is not
    /// on disk.
    pub fn content_for_markdown(&self, file: &str) -> Result<String, GemError> {
        let file = format!("{file}.md");
        let content = if self.markdown_files().contains(&file) {
            self.read_data_file(&file)?
        } else {
            None
        };
        Ok(content.unwrap_or_else(|| docs::not_found_placeholder(&file)))
    }

    fn read_data_file(&self, relative: &str) -> Result<Option<String>, GemError> {
        let content = docs::read_sanitized(
            &self.layout.data_dir(),
            relative,
            self.collaborators.sanitizer.as_ref(),
        )?;
        if content.is_none() {
            tracing::warn!(
                parent: &self.span,
                path = relative,
                "manifest path leaves the payload; refused"
            );
        }
        Ok(content)
    }
}

fn not_found(kind: ConstantKind, name: &str) -> GemError {
    GemError::ConstantNotFound {
        kind,
        name: name.to_string(),
    }
}

/// Plurality root constant; ties go to the root seen first.
fn most_used_root<'a>(namespaces: impl IntoIterator<Item = &'a Namespace>) -> Option<&'a str> {
    let mut tally: HashMap<&str, (usize, usize)> = HashMap::new();
    for (seen, ns) in namespaces.into_iter().enumerate() {
        tally.entry(ns.root_constant()).or_insert((seen, 0)).1 += 1;
    }
    tally
        .into_iter()
        .max_by_key(|&(_, (first_seen, count))| (count, Reverse(first_seen)))
        .map(|(root, _)| root)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}
