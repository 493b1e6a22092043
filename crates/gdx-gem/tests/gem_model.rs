//! Query surface of a materialized gem: structure, coverage, signatures, docs.

mod common;

use std::collections::HashMap;
use std::path::Path;

use chrono::{NaiveDate, TimeZone, Utc};
use common::{BETA_FILES, beta_archive, download_path, gem_archive, mock_download};
use gdx_gem::{
    Analysis, ConstantKind, GemError, GemLibrary, GemSpec, InMemorySampleStore, JsonAnalyzer,
    MethodKind, MethodSpec, Namespace, NamespaceKind, SampleParameter, SampledMethod,
    StaticAnalyzer, TypeSample,
};
use gdx_registry::{Registry, RegistryError, VersionEntry, VersionInfo};
use httpmock::prelude::*;
use pretty_assertions::assert_eq;

/// In-process registry: one version per gem.
struct FakeRegistry {
    gems: HashMap<String, VersionInfo>,
}

impl FakeRegistry {
    fn serving(server: &MockServer, versions: &[(&str, &str)]) -> Self {
        let gems = versions
            .iter()
            .map(|(name, version)| {
                let info = VersionInfo {
                    name: (*name).to_string(),
                    version: (*version).to_string(),
                    summary: "Widgets".to_string(),
                    description: "A widget toolkit.".to_string(),
                    version_created_at: Utc.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap(),
                    downloads: 42,
                    gem_uri: server.url(download_path(name, version)),
                };
                ((*name).to_string(), info)
            })
            .collect();
        Self { gems }
    }
}

impl Registry for FakeRegistry {
    async fn latest_version(&self, name: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.gems.get(name).map(|info| info.version.clone()))
    }

    async fn version_info(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Option<VersionInfo>, RegistryError> {
        Ok(self
            .gems
            .get(name)
            .filter(|info| info.version == version)
            .cloned())
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<VersionEntry>, RegistryError> {
        Ok(self
            .gems
            .get(name)
            .map(|info| {
                vec![VersionEntry {
                    number: info.version.clone(),
                    created_at: info.version_created_at,
                    downloads_count: info.downloads,
                    platform: "ruby".to_string(),
                    prerelease: false,
                }]
            })
            .unwrap_or_default())
    }
}

fn beta_analysis() -> Analysis {
    Analysis {
        classes: vec![
            Namespace::class("Beta::Widget")
                .with_method(MethodSpec::instance("build"))
                .with_method(MethodSpec::class("create")),
        ],
        modules: vec![Namespace::module("Beta::Util")],
        ..Analysis::default()
    }
}

fn sample(version: &str, receiver: &str, method: &str) -> TypeSample {
    TypeSample {
        gem_name: "beta".to_string(),
        gem_version: version.to_string(),
        receiver: receiver.to_string(),
        method_name: method.to_string(),
        parameters: Vec::new(),
        return_type: None,
    }
}

fn typed(method: &str, params: &[&str], returns: &str) -> TypeSample {
    let mut sample = sample("2.0.0", "Beta::Widget", method);
    sample.parameters = params
        .iter()
        .map(|t| SampleParameter {
            name: "arg".to_string(),
            type_name: (*t).to_string(),
        })
        .collect();
    sample.return_type = Some(returns.to_string());
    sample
}

async fn beta_library(
    server: &MockServer,
    root: &Path,
    analysis: Analysis,
    samples: Vec<TypeSample>,
) -> GemLibrary<FakeRegistry> {
    mock_download(server, "beta", "2.0.0", 200, beta_archive()).await;
    GemLibrary::new(FakeRegistry::serving(server, &[("beta", "2.0.0")]), root)
        .with_analyzer(StaticAnalyzer::new(analysis))
        .with_samples(InMemorySampleStore::new(samples))
}

async fn beta(server: &MockServer, root: &Path, samples: Vec<TypeSample>) -> GemSpec {
    beta_library(server, root, beta_analysis(), samples)
        .await
        .find("beta", None)
        .await
        .unwrap()
        .unwrap()
}

fn names<'a>(namespaces: impl IntoIterator<Item = &'a Namespace>) -> Vec<&'a str> {
    namespaces
        .into_iter()
        .map(|n| n.qualified_name.as_str())
        .collect()
}

#[tokio::test]
async fn descriptive_info_comes_from_the_registry() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let gem = beta(&server, temp.path(), Vec::new()).await;

    assert_eq!(gem.name(), "beta");
    assert_eq!(gem.summary(), "Widgets");
    assert_eq!(gem.downloads(), 42);
    assert_eq!(gem.released_at(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    assert!(gem.gem_uri().ends_with("/gems/beta-2.0.0.gem"));
}

#[tokio::test]
async fn absent_gem_is_none() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let library = beta_library(&server, temp.path(), beta_analysis(), Vec::new()).await;

    assert!(library.find("alpha", None).await.unwrap().is_none());
    assert!(library.find("beta", Some("1.0.0")).await.unwrap().is_none());
}

#[tokio::test]
async fn structure_is_sorted_and_queryable() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let gem = beta(&server, temp.path(), Vec::new()).await;

    assert_eq!(names(gem.classes()), vec!["Beta::Widget"]);
    assert_eq!(names(gem.modules()), vec!["Beta::Util"]);
    assert_eq!(names(gem.namespaces()), vec!["Beta::Widget", "Beta::Util"]);
    assert!(gem.top_level_modules().is_empty());
    assert!(gem.top_level_classes().is_empty());
    assert!(gem.methods().is_empty());
    assert_eq!(gem.methods_count(), 2);
    assert_eq!(gem.most_used_constant(), "Beta");

    let widget = gem.require_class("Beta::Widget").unwrap();
    assert_eq!(widget.find_method("create").unwrap().kind, MethodKind::Class);
    assert_eq!(
        gem.find_namespace("Beta::Util").map(|n| n.kind),
        Some(NamespaceKind::Module)
    );
    assert!(gem.find_module("Beta::Widget").is_none());

    let err = gem.require_namespace("Beta::Missing").unwrap_err();
    assert!(matches!(
        &err,
        GemError::ConstantNotFound { kind: ConstantKind::Namespace, name } if name == "Beta::Missing"
    ));
    assert_eq!(err.to_string(), "Couldn't find namespace 'Beta::Missing'");
    assert!(gem.require_module("Beta::Widget").is_err());
}

#[tokio::test]
async fn enclosing_module_is_top_level() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let mut analysis = beta_analysis();
    analysis.modules.push(Namespace::module("Beta"));
    analysis.instance_methods.push(MethodSpec::instance("helper"));

    let gem = beta_library(&server, temp.path(), analysis, Vec::new())
        .await
        .find("beta", None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(names(gem.top_level_modules()), vec!["Beta"]);
    assert_eq!(names(gem.modules()), vec!["Beta", "Beta::Util"]);
    assert_eq!(gem.methods_count(), 3);
}

#[tokio::test]
async fn metadata_is_decoded_from_the_archive() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let gem = beta(&server, temp.path(), Vec::new()).await;

    let metadata = gem.metadata();
    assert_eq!(metadata.name, "beta");
    assert_eq!(metadata.version, "2.0.0");
    assert_eq!(metadata.authors, vec!["Jane Doe"]);
    assert_eq!(metadata.required_ruby_version, vec![">= 3.1.0"]);
    assert_eq!(metadata.dependencies[0].requirement, vec!["~> 3.0"]);
    assert_eq!(metadata.files.len(), BETA_FILES.len());
}

#[tokio::test]
async fn coverage_counts_resolvable_samples_for_this_version() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let samples = vec![
        sample("2.0.0", "Beta::Widget", "build"),
        sample("2.0.0", "Beta::Widget", "build"),
        sample("2.0.0-java", "Beta::Widget", "create"),
        sample("2.0.0", "Beta::Widget", "destroy"),
        sample("2.0.0", "Beta::Gadget", "build"),
        sample("1.9.0", "Beta::Util", "build"),
    ];
    let mut analysis = beta_analysis();
    analysis.modules[0] = Namespace::module("Beta::Util").with_method(MethodSpec::class("slugify"));

    let gem = beta_library(&server, temp.path(), analysis, samples)
        .await
        .find("beta", None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(gem.samples().unwrap().len(), 5);
    assert_eq!(
        gem.type_sampled_methods().unwrap(),
        vec![
            SampledMethod {
                namespace: "Beta::Widget".to_string(),
                method: "build".to_string(),
                kind: MethodKind::Instance,
                count: 2,
            },
            SampledMethod {
                namespace: "Beta::Widget".to_string(),
                method: "create".to_string(),
                kind: MethodKind::Class,
                count: 1,
            },
        ]
    );
    assert_eq!(gem.type_sampled_methods_count().unwrap(), 2);
    assert_eq!(gem.methods_count(), 3);
    assert!((gem.typing_progress().unwrap() - 66.7).abs() < f64::EPSILON);
}

#[tokio::test]
async fn signatures_are_cached_and_reproducible() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let samples = vec![
        typed("build", &["Integer"], "Beta::Widget"),
        typed("build", &["String"], "Beta::Widget"),
    ];
    let gem = beta(&server, temp.path(), samples).await;

    let loose = gem.rbs_signature(false).unwrap();
    assert_eq!(
        loose,
        "class Beta::Widget\n  def build: ((Integer | String)) -> Beta::Widget\n  def self.create: (?) -> untyped\nend\n\nmodule Beta::Util\nend"
    );
    let cache = gem.layout().rbs_file_path(false);
    assert_eq!(std::fs::read_to_string(&cache).unwrap(), loose);

    std::fs::remove_file(&cache).unwrap();
    assert_eq!(gem.rbs_signature(false).unwrap(), loose);

    let strict = gem.rbs_signature(true).unwrap();
    assert_eq!(
        strict,
        "class Beta::Widget\n  def build: ((Integer | String)) -> Beta::Widget\nend"
    );
    assert!(gem.layout().rbs_file_path(true).is_file());
}

#[tokio::test]
async fn cached_signature_is_returned_verbatim() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let gem = beta(&server, temp.path(), Vec::new()).await;

    std::fs::write(gem.layout().rbs_file_path(true), "# edited by hand").unwrap();
    assert_eq!(gem.rbs_signature(true).unwrap(), "# edited by hand");
}

#[tokio::test]
async fn documentation_files_are_classified_and_sanitized() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let gem = beta(&server, temp.path(), Vec::new()).await;

    assert_eq!(
        gem.files(),
        vec!["lib/beta.rb", "lib/beta/util.rb", "lib/beta/widget.rb"]
    );
    assert_eq!(gem.documentation_files(), vec!["docs/usage.md"]);
    assert_eq!(gem.guide_files(), vec!["guides/upgrading.md"]);
    assert_eq!(gem.rbs_files(), vec!["sig/beta.rbs"]);
    assert_eq!(gem.readme().as_deref(), Some("README.md"));
    assert_eq!(gem.readme_content().unwrap(), "Beta\nBuild widgets.\n");
    assert_eq!(
        gem.content_for_markdown("docs/usage").unwrap(),
        "Call Beta::Widget.create.\n"
    );
    assert_eq!(
        gem.content_for_markdown("secrets").unwrap(),
        r#"File "secrets.md" not found"#
    );
    assert_eq!(
        gem.content_for_markdown("lib/beta").unwrap(),
        r#"File "lib/beta.md" not found"#
    );
}

#[tokio::test]
async fn untrusted_metadata_degrades_to_empty() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let gemspec = "--- !ruby/object:Gem::Specification\n\
                   name: evil\n\
                   files:\n\
                   - README.md\n\
                   payload: !ruby/object:Gem::Installer\n  spec: x\n";
    let archive = gem_archive(gemspec, &[("README.md", "pwned")]);
    let path = download_path("evil", "0.1.0");
    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(200).body(archive);
        })
        .await;

    let gem = GemLibrary::new(FakeRegistry::serving(&server, &[("evil", "0.1.0")]), temp.path())
        .find("evil", None)
        .await
        .unwrap()
        .unwrap();

    assert!(gem.metadata().is_empty());
    assert!(gem.markdown_files().is_empty());
    assert_eq!(gem.readme_content().unwrap(), "No README");
}

#[tokio::test]
async fn manifest_paths_cannot_leave_the_payload() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    let outside = temp.path().join("outside");
    std::fs::create_dir_all(&outside).unwrap();
    std::fs::write(outside.join("README.md"), "HOST SECRET").unwrap();
    std::fs::write(outside.join("notes.md"), "HOST NOTES").unwrap();

    // data dir is <root>/escape/0.1.0/data, four levels below the tempdir.
    let gemspec = format!(
        "--- !ruby/object:Gem::Specification\n\
         name: escape\n\
         files:\n\
         - {}\n\
         - ../../../../outside/notes.md\n\
         - lib/escape.rb\n",
        outside.join("README.md").display()
    );
    let archive = gem_archive(&gemspec, &[("lib/escape.rb", "module Escape; end\n")]);
    let path = download_path("escape", "0.1.0");
    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(200).body(archive);
        })
        .await;

    let root = temp.path().join("gems");
    let gem = GemLibrary::new(FakeRegistry::serving(&server, &[("escape", "0.1.0")]), &root)
        .find("escape", None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(gem.markdown_files().len(), 2);
    assert_eq!(gem.readme_content().unwrap(), "No README");
    assert_eq!(
        gem.content_for_markdown("../../../../outside/notes").unwrap(),
        r#"File "../../../../outside/notes.md" not found"#
    );
}

#[tokio::test]
async fn analyzer_failure_degrades_to_empty_analysis() {
    let server = MockServer::start_async().await;
    let temp = tempfile::tempdir().unwrap();
    mock_download(&server, "beta", "2.0.0", 200, beta_archive()).await;

    let gem = GemLibrary::new(FakeRegistry::serving(&server, &[("beta", "2.0.0")]), temp.path())
        .with_analyzer(JsonAnalyzer::new(temp.path().join("missing.json")))
        .find("beta", None)
        .await
        .unwrap()
        .unwrap();

    assert!(gem.namespaces().is_empty());
    assert_eq!(gem.methods_count(), 0);
    assert_eq!(gem.most_used_constant(), "Beta");
    assert!((gem.typing_progress().unwrap()).abs() < f64::EPSILON);
    assert_eq!(gem.rbs_signature(false).unwrap(), "");
}
