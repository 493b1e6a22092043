use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Latest published version of a gem.
    Latest(NameArgs),
    /// Published versions of a gem.
    Versions(VersionsArgs),
    /// Fetch a gem and summarize it.
    Show(GemArgs),
    /// List files shipped in a gem.
    Files(FilesArgs),
    /// Print a gem's sanitized README.
    Readme(GemArgs),
    /// Print one of a gem's markdown files, sanitized.
    Doc(DocArgs),
    /// Generate RBS signatures from an exported analysis.
    Rbs(RbsArgs),
    /// Typing progress from an exported analysis and recorded samples.
    Progress(ProgressArgs),
}

#[derive(Clone, Debug, Args)]
pub struct NameArgs {
    /// Gem name.
    pub name: String,
}

#[derive(Clone, Debug, Args)]
pub struct GemArgs {
    /// Gem name.
    pub name: String,

    /// Exact version (defaults to the latest).
    #[arg(long = "version", value_name = "VERSION")]
    pub gem_version: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct VersionsArgs {
    /// Gem name.
    pub name: String,

    /// Group by `major.minor` series.
    #[arg(long)]
    pub grouped: bool,
}

#[derive(Clone, Debug, Args)]
pub struct FilesArgs {
    #[command(flatten)]
    pub gem: GemArgs,

    /// Which files to list.
    #[arg(long, value_enum, default_value = "source")]
    pub kind: FileKindArg,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum FileKindArg {
    Source,
    Markdown,
    Docs,
    Guides,
    Rbs,
}

impl From<FileKindArg> for gdx_gem::FileKind {
    fn from(kind: FileKindArg) -> Self {
        match kind {
            FileKindArg::Source => Self::Source,
            FileKindArg::Markdown => Self::Markdown,
            FileKindArg::Docs => Self::Docs,
            FileKindArg::Guides => Self::Guides,
            FileKindArg::Rbs => Self::Rbs,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct DocArgs {
    #[command(flatten)]
    pub gem: GemArgs,

    /// Markdown file path without the `.md` suffix (e.g. `docs/usage`).
    pub file: String,
}

#[derive(Clone, Debug, Args)]
pub struct RbsArgs {
    #[command(flatten)]
    pub gem: GemArgs,

    /// Analysis JSON exported by a structural analyzer.
    #[arg(long, value_name = "FILE")]
    pub analysis: PathBuf,

    /// Recorded type samples, one JSON object per line.
    #[arg(long, value_name = "FILE")]
    pub samples: Option<PathBuf>,

    /// Only emit methods with recorded samples.
    #[arg(long)]
    pub require_samples: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ProgressArgs {
    #[command(flatten)]
    pub gem: GemArgs,

    /// Analysis JSON exported by a structural analyzer.
    #[arg(long, value_name = "FILE")]
    pub analysis: PathBuf,

    /// Recorded type samples, one JSON object per line.
    #[arg(long, value_name = "FILE")]
    pub samples: PathBuf,
}
