use anyhow::bail;
use gdx_gem::{JsonAnalyzer, JsonlSampleStore};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::RbsArgs;
use crate::commands::shared::resolve::find_gem;
use crate::context::AppContext;
use crate::output::output_document;

/// Handle `gdx rbs`.
pub async fn handle(args: &RbsArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    if !args.analysis.is_file() {
        bail!("analysis file '{}' does not exist", args.analysis.display());
    }

    let mut library = ctx.library().with_analyzer(JsonAnalyzer::new(&args.analysis));
    if let Some(samples) = &args.samples {
        library = library.with_samples(JsonlSampleStore::new(samples));
    }

    let spec = find_gem(&library, &args.gem).await?;
    let signature = spec.rbs_signature(args.require_samples)?;
    let path = spec.layout().rbs_file_path(args.require_samples);

    output_document(
        spec.name(),
        spec.version(),
        &path.display().to_string(),
        &signature,
        flags.format,
    )
}
