use crate::cli::GlobalFlags;
use crate::cli::root_commands::GemArgs;
use crate::commands::shared::resolve::find_gem;
use crate::context::AppContext;
use crate::output::output_document;

/// Handle `gdx readme`.
pub async fn handle(args: &GemArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let spec = find_gem(&ctx.library(), args).await?;
    let content = spec.readme_content()?;
    let path = spec.readme().unwrap_or_default();

    output_document(spec.name(), spec.version(), &path, &content, flags.format)
}
