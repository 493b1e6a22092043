//! # gdx-gem
//!
//! Acquisition and documentation model for published gems.
//!
//! [`GemLibrary::find`] resolves a gem name (and optional version) against a
//! [`gdx_registry::Registry`], downloads the `.gem` archive, unpacks it under
//! the cache root, and returns a [`GemSpec`] for querying:
//!
//! - manifest metadata, decoded against a tag allow-list ([`metadata`])
//! - namespaces and methods from a [`StructuralAnalyzer`] ([`analysis`])
//! - typing progress from recorded [`TypeSample`]s ([`coverage`])
//! - cached RBS signatures ([`signature`])
//! - documentation files and sanitized content ([`docs`])
//!
//! The on-disk layout ([`GemLayout`]) is the cache. A per-version lock file
//! keeps concurrent callers from materializing the same gem twice.
//!
//! ```no_run
//! # async fn run() -> Result<(), gdx_gem::GemError> {
//! use gdx_config::GemdexConfig;
//! use gdx_gem::GemLibrary;
//!
//! let config = GemdexConfig::default();
//! let library = GemLibrary::from_config(&config);
//! if let Some(gem) = library.find("rack", None).await? {
//!     println!("{} {}: {:?}", gem.name(), gem.version(), gem.readme());
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod coverage;
pub mod docs;
mod error;
mod fetch;
mod layout;
mod library;
mod lock;
pub mod metadata;
pub mod samples;
pub mod signature;
mod spec;
mod unpack;

pub use analysis::{
    Analysis, JsonAnalyzer, MethodKind, MethodSpec, Namespace, NamespaceKind, SourceTree,
    StaticAnalyzer, StructuralAnalyzer,
};
pub use coverage::SampledMethod;
pub use docs::{FileKind, Sanitizer, TagStripper};
pub use error::{ConstantKind, GemError};
pub use fetch::{FetchOutcome, GemFetcher};
pub use layout::GemLayout;
pub use library::GemLibrary;
pub use lock::MaterializeLock;
pub use metadata::{Dependency, DependencyKind, Metadata, MetadataCodec};
pub use samples::{
    InMemorySampleStore, JsonlSampleStore, SampleParameter, TypeSample, TypeSampleStore,
};
pub use spec::GemSpec;
pub use unpack::UnpackReport;
