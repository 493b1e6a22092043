use crate::cli::GlobalFlags;
use crate::cli::root_commands::DocArgs;
use crate::commands::shared::resolve::find_gem;
use crate::context::AppContext;
use crate::output::output_document;

/// Handle `gdx doc`.
pub async fn handle(args: &DocArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let spec = find_gem(&ctx.library(), &args.gem).await?;
    let content = spec.content_for_markdown(&args.file)?;
    let path = format!("{}.md", args.file);

    output_document(spec.name(), spec.version(), &path, &content, flags.format)
}
