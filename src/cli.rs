use crate::config::{DEFAULT_CASE_DIR, DEFAULT_MEDIA_DIR, DEFAULT_OUTPUT_DIR};
use crate::run::RunConfig;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Run OpenFOAM cylinder-flow cases and extract their results to CSV
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract velocity, pressure and force coefficients from a finished case
    Extract(ExtractArgs),
    /// Configure and run one simulation, then extract its results
    Run(RunArgs),
    /// Run one simulation per (nu, Re) pair of a JSON manifest
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Solver case directory containing the time-step directories
    #[arg(default_value = DEFAULT_CASE_DIR)]
    pub case_dir: PathBuf,

    /// Directory the CSV tables are written to
    #[arg(default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Solver case directory
    #[arg(default_value = DEFAULT_CASE_DIR)]
    pub case_dir: PathBuf,

    /// End time for the simulation
    #[arg(long)]
    pub end_time: f64,

    /// Time step size
    #[arg(long)]
    pub delta_t: f64,

    /// Reynolds number
    #[arg(long = "Re", visible_alias = "re")]
    pub reynolds: f64,

    /// Inlet velocity (m/s)
    #[arg(long, default_value_t = 1.0)]
    pub velocity: f64,

    /// Kinematic viscosity (m²/s); derived from the Reynolds number when omitted
    #[arg(long)]
    pub nu: Option<f64>,

    /// Directory the CSV tables are written to
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Skip rendering the flow video
    #[arg(long)]
    pub no_video: bool,

    /// Skip extracting results after the run
    #[arg(long)]
    pub no_extract: bool,
}

impl RunArgs {
    pub fn into_config(self, work_dir: &Path) -> RunConfig {
        RunConfig {
            case_dir: self.case_dir,
            output_dir: self.output_dir,
            work_dir: work_dir.to_path_buf(),
            end_time: self.end_time,
            delta_t: self.delta_t,
            reynolds: self.reynolds,
            velocity: self.velocity,
            nu: self.nu,
            render_video: !self.no_video,
            extract: !self.no_extract,
        }
    }
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSON manifest with equal-length "nu" and "Re" arrays
    pub manifest: PathBuf,

    /// Solver case directory
    #[arg(default_value = DEFAULT_CASE_DIR)]
    pub case_dir: PathBuf,

    /// End time for every simulation
    #[arg(long)]
    pub end_time: f64,

    /// Time step size for every simulation
    #[arg(long)]
    pub delta_t: f64,

    /// Inlet velocity (m/s)
    #[arg(long, default_value_t = 1.0)]
    pub velocity: f64,

    /// Directory receiving one run_Re<Re>_nu<nu> folder per simulation
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Directory rendered videos are moved to
    #[arg(long, default_value = DEFAULT_MEDIA_DIR)]
    pub media_dir: PathBuf,
}

pub fn get_args() -> Cli {
    Cli::parse()
}
