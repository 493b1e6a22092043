use anyhow::{Context, bail};
use gdx_gem::{GemLibrary, GemSpec};
use gdx_registry::Registry;

use crate::cli::root_commands::GemArgs;

/// Materialize the gem named by `args`, failing when the registry has no
/// such gem or version.
pub async fn find_gem<R: Registry>(
    library: &GemLibrary<R>,
    args: &GemArgs,
) -> anyhow::Result<GemSpec> {
    let spec = library
        .find(&args.name, args.gem_version.as_deref())
        .await
        .with_context(|| format!("failed to fetch gem '{}'", describe(args)))?;

    match spec {
        Some(spec) => Ok(spec),
        None => bail!("gem '{}' not found", describe(args)),
    }
}

fn describe(args: &GemArgs) -> String {
    match args.gem_version.as_deref() {
        Some(version) if !version.trim().is_empty() => format!("{} {version}", args.name),
        _ => args.name.clone(),
    }
}
