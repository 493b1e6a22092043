use anyhow::{Context, bail};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::NameArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct LatestResponse<'a> {
    name: &'a str,
    version: String,
}

/// Handle `gdx latest`.
pub async fn handle(args: &NameArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let version = ctx
        .library()
        .latest_version(&args.name)
        .await
        .with_context(|| format!("failed to look up latest version of '{}'", args.name))?;

    let Some(version) = version else {
        bail!("gem '{}' not found", args.name);
    };

    output(
        &LatestResponse {
            name: &args.name,
            version,
        },
        flags.format,
    )
}
