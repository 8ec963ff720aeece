use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "molgeom - distance-geometry coordinate cleanup and stereochemistry on molecular graphs.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refine embedded coordinates against distance bounds and volume constraints.
    Cleanup(CleanupArgs),
    /// Analyze or convert the stereochemistry of a molecular graph.
    Stereo(StereoArgs),
}

/// Arguments for the `cleanup` subcommand.
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Path to the cleanup job file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub job: PathBuf,

    /// Path for the TOML file receiving the refined coordinates.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Override the gradient threshold from the job's `[settings]` table.
    #[arg(short, long, value_name = "FLOAT")]
    pub threshold: Option<f64>,

    /// Override the iteration cap (defaults to three times the coordinate count).
    #[arg(long, value_name = "INT")]
    pub max_iterations: Option<usize>,

    /// Never mirror the starting structure, even if most chiralities are inverted.
    #[arg(long)]
    pub no_flip_check: bool,
}

/// Arguments for the `stereo` subcommand.
#[derive(Args, Debug)]
pub struct StereoArgs {
    /// Path to the molecular graph in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub graph: PathBuf,

    /// The operation to perform.
    #[arg(value_enum)]
    pub action: StereoAction,

    /// Write the result to a file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoAction {
    /// Every complete stereo assignment of the graph.
    Stereomers,
    /// The stereomers consistent with the parities already assigned.
    Substereomers,
    /// Atoms and bonds that can carry a stereo parity.
    Stereogenic,
    /// Convert absolute parities to index-based parities.
    ToIndex,
    /// Convert index-based parities to absolute parities.
    FromIndex,
}
