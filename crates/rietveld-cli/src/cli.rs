use clap::{Args, Parser, Subcommand, ValueEnum};
use rietveld::engine::stages::Stage;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Mark Wolf",
    version,
    about = "Rietveld CLI - staged Rietveld refinement of powder diffraction patterns driven by FullProf.",
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
    /// Refine a phase model against an observed pattern with FullProf.
    Refine(RefineArgs),
    /// Parse the summary and log left behind by a FullProf run.
    Inspect(InspectArgs),
}

/// Which refinement to run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageChoice {
    /// Every applicable stage in the standard order.
    All,
    Background,
    Displacement,
    PeakWidths,
    UnitCells,
    ScaleFactors,
}

impl StageChoice {
    /// The single stage selected, or `None` for all stages.
    pub fn stage(self) -> Option<Stage> {
        match self {
            StageChoice::All => None,
            StageChoice::Background => Some(Stage::Background),
            StageChoice::Displacement => Some(Stage::Displacement),
            StageChoice::PeakWidths => Some(Stage::PeakWidths),
            StageChoice::UnitCells => Some(Stage::UnitCells),
            StageChoice::ScaleFactors => Some(Stage::ScaleFactors),
        }
    }
}

/// Arguments for the `refine` subcommand.
#[derive(Args, Debug)]
pub struct RefineArgs {
    // --- Core Arguments ---
    /// Path to the observed pattern (two columns: 2θ and intensity).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to the refinement configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the phase definition file named in the config file.
    #[arg(short, long, value_name = "PATH")]
    pub phases: Option<PathBuf>,

    /// Stage to refine.
    #[arg(short, long, value_enum, default_value_t = StageChoice::All)]
    pub stage: StageChoice,

    // --- Refinement Overrides ---
    /// Override the directory and stem of the solver files (e.g. runs/sample).
    #[arg(short = 'r', long, value_name = "PATH")]
    pub file_root: Option<PathBuf>,

    /// Keep the solver's temporary files after a successful run.
    #[arg(long)]
    pub keep_temp_files: bool,

    /// Override the solver timeout in seconds (0 waits indefinitely).
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Directory containing the FullProf binary. Defaults to $FULLPROF.
    #[arg(long, value_name = "DIR")]
    pub solver_dir: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S instrument.zero=0.01
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the refinement summary (.sum).
    #[arg(required = true, value_name = "PATH")]
    pub summary: PathBuf,

    /// Number of phases in the refined deck.
    #[arg(short = 'n', long, default_value_t = 1, value_name = "INT")]
    pub num_phases: usize,

    /// Run log (.log) used to diagnose an unsuccessful refinement.
    #[arg(short, long, value_name = "PATH")]
    pub log: Option<PathBuf>,
}
