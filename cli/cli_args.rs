use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ScanOpts {
    #[arg(
        help = "Directory to scan (default: current dir).",
        value_name = "ROOT"
    )]
    pub root: Option<PathBuf>,

    #[arg(
        short = 'c',
        long,
        help = "Path of the TOML config file (default: <ROOT>/jsmashy.toml).",
        value_name = "PATH",
        conflicts_with = "no_config",
        help_heading = "Configuration"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        help = "Do not load any TOML config file.",
        conflicts_with = "config",
        help_heading = "Configuration"
    )]
    pub no_config: bool,

    #[arg(
        long,
        help = "Ignore .gitignore files (.jsmashyignore is still honored).",
        help_heading = "Filtering"
    )]
    pub no_gitignore: bool,

    #[arg(
        short = 'e',
        long,
        help = "Extra glob to exclude, relative to ROOT (repeatable, comma-separated).",
        value_name = "GLOB",
        value_delimiter = ',',
        help_heading = "Filtering"
    )]
    pub exclude: Vec<String>,

    #[arg(
        long,
        help = "Skip files larger than this (e.g. 512KB, 2MB).",
        value_name = "SIZE",
        help_heading = "Filtering"
    )]
    pub max_file_size: Option<String>,

    #[arg(
        long,
        help = "Store every file as-is, without skeletonizing sources.",
        help_heading = "Filtering"
    )]
    pub no_skeleton: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pack a source tree into a single XML document for AI assistants.",
    long_about = "jsmashy walks a project directory honoring .gitignore and .jsmashyignore files, \nreplaces Java method bodies with a placeholder to save space, and writes \nthe result as one XML document.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  jsmashy smash . -o build/context.xml\n  jsmashy smash ~/src/app --no-skeleton > app.xml\n  jsmashy list --exclude 'target/,*.g4'",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv, -vvv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "s",
        about = "Scan a directory and write the XML document."
    )]
    Smash(SmashArgs),

    #[command(
        visible_alias = "l",
        about = "Scan a directory and list the files that would be packed."
    )]
    List(ListArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SmashArgs {
    #[command(flatten)]
    pub scan: ScanOpts,

    #[arg(
        short = 'o',
        long,
        help = "Write the document to FILE instead of stdout.",
        value_name = "FILE",
        help_heading = "Output"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Include a generation timestamp in the summary.",
        help_heading = "Output"
    )]
    pub timestamp: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub scan: ScanOpts,
}
