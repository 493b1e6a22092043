use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::FilesArgs;
use crate::commands::shared::resolve::find_gem;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct FilesResponse {
    name: String,
    version: String,
    files: Vec<String>,
}

/// Handle `gdx files`.
pub async fn handle(args: &FilesArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let spec = find_gem(&ctx.library(), &args.gem).await?;
    let mut files = spec.files_of(args.kind.into());
    if let Some(limit) = flags.limit {
        files.truncate(usize::try_from(limit)?);
    }

    output(
        &FilesResponse {
            name: spec.name().to_string(),
            version: spec.version().to_string(),
            files,
        },
        flags.format,
    )
}
