use anyhow::bail;
use gdx_gem::{GemSpec, JsonAnalyzer, JsonlSampleStore, SampledMethod};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ProgressArgs;
use crate::commands::shared::limit::{apply_limit, effective_limit};
use crate::commands::shared::resolve::find_gem;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ProgressResponse {
    name: String,
    version: String,
    methods_count: usize,
    type_sampled_methods_count: usize,
    typing_progress: f64,
    sampled_methods: Vec<SampledMethod>,
}

/// Handle `gdx progress`.
pub async fn handle(
    args: &ProgressArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    if !args.analysis.is_file() {
        bail!("analysis file '{}' does not exist", args.analysis.display());
    }

    let library = ctx
        .library()
        .with_analyzer(JsonAnalyzer::new(&args.analysis))
        .with_samples(JsonlSampleStore::new(&args.samples));

    let spec = find_gem(&library, &args.gem).await?;
    let mut response = report(&spec)?;
    apply_limit(
        &mut response.sampled_methods,
        effective_limit(flags.limit, ctx.default_limit()),
    )?;

    output(&response, flags.format)
}

fn report(spec: &GemSpec) -> anyhow::Result<ProgressResponse> {
    let sampled_methods = spec.type_sampled_methods()?;
    Ok(ProgressResponse {
        name: spec.name().to_string(),
        version: spec.version().to_string(),
        methods_count: spec.methods_count(),
        type_sampled_methods_count: sampled_methods.len(),
        typing_progress: spec.typing_progress()?,
        sampled_methods,
    })
}
