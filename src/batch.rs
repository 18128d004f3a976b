use crate::config::{BATCH_SUMMARY_FILE, VIDEO_FILE};
use crate::extract::extract_to_dir;
use crate::io::csv::format_float;
use crate::run::run_command;
use crate::series::DragEstimate;
use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("'nu' and 'Re' arrays must have equal length (got {nu} and {re})")]
    LengthMismatch { nu: usize, re: usize },

    #[error("'nu' and 'Re' arrays cannot be empty")]
    Empty,

    #[error("'{key}'[{index}] must be positive, got {value}")]
    NonPositive {
        key: &'static str,
        index: usize,
        value: f64,
    },
}

// Parameter sets for a batch: `{"nu": [...], "Re": [...]}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    pub nu: Vec<f64>,
    #[serde(rename = "Re")]
    pub re: Vec<f64>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.nu.len() != self.re.len() {
            return Err(ManifestError::LengthMismatch {
                nu: self.nu.len(),
                re: self.re.len(),
            });
        }
        if self.is_empty() {
            return Err(ManifestError::Empty);
        }

        for (key, values) in [("nu", &self.nu), ("Re", &self.re)] {
            if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| **v <= 0.0) {
                return Err(ManifestError::NonPositive { key, index, value });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nu.is_empty()
    }

    /// `(nu, Re)` pairs in manifest order.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.nu.iter().copied().zip(self.re.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    pub index: usize,
    pub nu: f64,
    pub reynolds: f64,
}

impl RunParams {
    pub fn label(&self) -> String {
        format!("Re{}_nu{}", format_float(self.reynolds), format_float(self.nu))
    }
}

/// Runs the solver for one parameter set. The batch extracts the results
/// itself once this returns.
pub trait CaseLauncher {
    fn launch(&mut self, params: &RunParams) -> Result<()>;
}

// Re-invokes this executable's `run` subcommand, one child process per run
pub struct SubprocessLauncher {
    pub exe: PathBuf,
    pub case_dir: PathBuf,
    pub work_dir: PathBuf,
    pub media_dir: PathBuf,
    pub end_time: f64,
    pub delta_t: f64,
    pub velocity: f64,
}

impl CaseLauncher for SubprocessLauncher {
    fn launch(&mut self, params: &RunParams) -> Result<()> {
        let mut cmd = Command::new(&self.exe);
        cmd.current_dir(&self.work_dir)
            .arg("run")
            .arg(&self.case_dir)
            .args(["--end-time", self.end_time.to_string().as_str()])
            .args(["--delta-t", self.delta_t.to_string().as_str()])
            .args(["--Re", params.reynolds.to_string().as_str()])
            .args(["--nu", params.nu.to_string().as_str()])
            .args(["--velocity", self.velocity.to_string().as_str()])
            .arg("--no-extract");
        run_command(&mut cmd, "simulation run")?;

        let video = self.work_dir.join(VIDEO_FILE);
        if video.exists() {
            fs::create_dir_all(&self.media_dir)
                .with_context(|| format!("Failed to create media directory: {:?}", self.media_dir))?;
            let target = self.media_dir.join(format!("flow_{}.mp4", params.label()));
            fs::rename(&video, &target)
                .with_context(|| format!("Failed to move {:?} to {:?}", video, target))?;
            info!("Video saved as: {:?}", target);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub manifest: PathBuf,
    pub case_dir: PathBuf,
    pub output_dir: PathBuf,
    pub velocity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub index: usize,
    pub nu: f64,
    #[serde(rename = "Re")]
    pub reynolds: f64,
    pub run_dir: PathBuf,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub started_at: String,
    pub finished_at: String,
    pub runs: Vec<RunRecord>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.runs.len()
    }

    pub fn succeeded(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.status == RunStatus::Completed)
            .count()
    }

    pub fn report(&self) -> String {
        format!("{}/{} simulations completed", self.succeeded(), self.total())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create batch summary: {:?}", path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).context("Failed to write batch summary")?;
        writer.flush().context("Failed to flush batch summary")?;
        Ok(())
    }
}

/// Runs every parameter set of the manifest in order.
///
/// A malformed manifest aborts before any run. After that, a failed run is
/// logged and counted, and the batch moves on to the next pair.
pub fn run_batch(config: &BatchConfig, launcher: &mut dyn CaseLauncher) -> Result<BatchSummary> {
    let manifest = Manifest::load(&config.manifest)?;
    let started_at = Local::now().to_rfc3339();
    info!("Loaded {} parameter sets from {:?}", manifest.len(), config.manifest);

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", config.output_dir))?;

    let pb = ProgressBar::new(manifest.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} runs ({eta})")?
            .progress_chars("#>-"),
    );

    let drag = DragEstimate::with_inlet_velocity(config.velocity);
    let mut runs = Vec::with_capacity(manifest.len());

    for (idx, (nu, reynolds)) in manifest.pairs().enumerate() {
        let params = RunParams {
            index: idx + 1,
            nu,
            reynolds,
        };
        let run_dir = config.output_dir.join(format!("run_{}", params.label()));
        info!("Running simulation {} with Re={}, nu={}", params.index, reynolds, nu);

        let result = launcher
            .launch(&params)
            .and_then(|()| extract_to_dir(&config.case_dir, &run_dir, &drag));

        let (status, error) = match result {
            Ok(_) => (RunStatus::Completed, None),
            Err(e) => {
                error!("Simulation {} failed: {:#}", params.index, e);
                (RunStatus::Failed, Some(format!("{:#}", e)))
            }
        };
        runs.push(RunRecord {
            index: params.index,
            nu,
            reynolds,
            run_dir,
            status,
            error,
        });
        pb.inc(1);
    }
    pb.finish_and_clear();

    let summary = BatchSummary {
        started_at,
        finished_at: Local::now().to_rfc3339(),
        runs,
    };
    summary.save(&config.output_dir.join(BATCH_SUMMARY_FILE))?;
    Ok(summary)
}
