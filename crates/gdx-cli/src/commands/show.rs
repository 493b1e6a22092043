use chrono::NaiveDate;
use gdx_gem::{FileKind, GemSpec};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::GemArgs;
use crate::commands::shared::resolve::find_gem;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ShowResponse {
    name: String,
    version: String,
    summary: String,
    description: String,
    released_at: NaiveDate,
    downloads: u64,
    gem_uri: String,
    authors: Vec<String>,
    licenses: Vec<String>,
    homepage: Option<String>,
    required_ruby_version: Vec<String>,
    dependencies: Vec<DependencyRow>,
    readme: Option<String>,
    files: FileCounts,
}

#[derive(Debug, Serialize)]
struct DependencyRow {
    name: String,
    requirement: String,
}

#[derive(Debug, Serialize)]
struct FileCounts {
    source: usize,
    markdown: usize,
    docs: usize,
    guides: usize,
    rbs: usize,
}

/// Handle `gdx show`.
pub async fn handle(args: &GemArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let spec = find_gem(&ctx.library(), args).await?;
    output(&summarize(&spec), flags.format)
}

fn summarize(spec: &GemSpec) -> ShowResponse {
    let metadata = spec.metadata();
    ShowResponse {
        name: spec.name().to_string(),
        version: spec.version().to_string(),
        summary: spec.summary().to_string(),
        description: spec.description().to_string(),
        released_at: spec.released_at(),
        downloads: spec.downloads(),
        gem_uri: spec.gem_uri().to_string(),
        authors: metadata.authors.clone(),
        licenses: metadata.licenses.clone(),
        homepage: metadata.homepage.clone(),
        required_ruby_version: metadata.required_ruby_version.clone(),
        dependencies: metadata
            .runtime_dependencies()
            .map(|dep| DependencyRow {
                name: dep.name.clone(),
                requirement: dep.requirement.join(", "),
            })
            .collect(),
        readme: spec.readme(),
        files: FileCounts {
            source: spec.files_of(FileKind::Source).len(),
            markdown: spec.files_of(FileKind::Markdown).len(),
            docs: spec.files_of(FileKind::Docs).len(),
            guides: spec.files_of(FileKind::Guides).len(),
            rbs: spec.files_of(FileKind::Rbs).len(),
        },
    }
}
