use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: &Commands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Latest(args) => commands::latest::handle(args, ctx, flags).await,
        Commands::Versions(args) => commands::versions::handle(args, ctx, flags).await,
        Commands::Show(args) => commands::show::handle(args, ctx, flags).await,
        Commands::Files(args) => commands::files::handle(args, ctx, flags).await,
        Commands::Readme(args) => commands::readme::handle(args, ctx, flags).await,
        Commands::Doc(args) => commands::doc::handle(args, ctx, flags).await,
        Commands::Rbs(args) => commands::rbs::handle(args, ctx, flags).await,
        Commands::Progress(args) => commands::progress::handle(args, ctx, flags).await,
    }
}
