use anyhow::{Context, bail};
use gdx_registry::VersionEntry;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::VersionsArgs;
use crate::commands::shared::limit::{apply_limit, effective_limit};
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct SeriesResponse {
    series: String,
    versions: Vec<VersionEntry>,
}

/// Handle `gdx versions`.
pub async fn handle(
    args: &VersionsArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let limit = effective_limit(flags.limit, ctx.default_limit());
    let library = ctx.library();

    if args.grouped {
        let groups = library
            .grouped_versions(&args.name)
            .await
            .with_context(|| format!("failed to list versions of '{}'", args.name))?;
        if groups.is_empty() {
            bail!("gem '{}' not found", args.name);
        }
        let mut rows = into_series(groups);
        apply_limit(&mut rows, limit)?;
        return output(&rows, flags.format);
    }

    let mut rows = library
        .versions(&args.name)
        .await
        .with_context(|| format!("failed to list versions of '{}'", args.name))?;
    if rows.is_empty() {
        bail!("gem '{}' not found", args.name);
    }
    apply_limit(&mut rows, limit)?;
    output(&rows, flags.format)
}

fn into_series(groups: Vec<(String, Vec<VersionEntry>)>) -> Vec<SeriesResponse> {
    groups
        .into_iter()
        .map(|(series, versions)| SeriesResponse { series, versions })
        .collect()
}
