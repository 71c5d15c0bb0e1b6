use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Descry developers",
    version,
    about = "Descry CLI - Benchmarks how atomic-descriptor computations scale with system size and renders the timing curves as charts.",
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
    /// Time SOAP descriptor generation across growing supercells, one curve
    /// per radial basis.
    Soap(ExperimentArgs),
    /// Time SOAP derivative generation across growing supercells, one curve
    /// per derivative method.
    Derivatives(ExperimentArgs),
    /// Time Coulomb-matrix generation across growing supercells, one curve
    /// per permutation option.
    Cm(ExperimentArgs),
}

/// Arguments shared by all scaling experiments.
#[derive(Args, Debug, Default)]
pub struct ExperimentArgs {
    /// Path to a TOML configuration file overriding the built-in defaults.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory the chart (and optional CSV) artifacts are written into.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Version label embedded in the chart title and artifact file names.
    /// Defaults to the descriptor library version.
    #[arg(long, value_name = "LABEL")]
    pub label: Option<String>,

    /// Override the first replication count of the sweep.
    #[arg(long, value_name = "INT")]
    pub min_cells: Option<usize>,

    /// Override the end of the sweep (exclusive replication count).
    #[arg(long, value_name = "INT")]
    pub max_cells: Option<usize>,

    /// Override the cutoff radius in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub rcut: Option<f64>,

    /// Override the number of radial basis functions.
    #[arg(long, value_name = "INT")]
    pub nmax: Option<usize>,

    /// Override the maximum spherical-harmonic degree.
    #[arg(long, value_name = "INT")]
    pub lmax: Option<usize>,

    /// Also write the raw timing samples as a CSV file next to the chart.
    #[arg(long)]
    pub csv: bool,
}
