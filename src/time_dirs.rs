use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A solver output directory named after the simulation time it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeDir {
    pub time: f64,
    pub name: String,
    pub path: PathBuf,
}

/// Returns the simulation time a directory name stands for.
///
/// Accepted names are `0` or a plain decimal (digits with at most one `.`)
/// greater than zero. Anything else, including exponent notation and
/// `constant`/`system`, is not a time step.
pub fn parse_time_dir_name(name: &str) -> Option<f64> {
    if name == "0" {
        return Some(0.0);
    }

    let mut dots = 0;
    for c in name.chars() {
        match c {
            '0'..='9' => {}
            '.' => dots += 1,
            _ => return None,
        }
    }
    if dots > 1 {
        return None;
    }

    let time = name.parse::<f64>().ok()?;
    (time > 0.0).then_some(time)
}

/// Lists the time-step directories of a case, ordered by numeric time.
pub fn list_time_dirs(case_dir: &Path) -> Result<Vec<TimeDir>> {
    let entries = fs::read_dir(case_dir)
        .with_context(|| format!("Failed to read case directory: {:?}", case_dir))?;

    let mut time_dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {:?}", case_dir))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        match parse_time_dir_name(&name) {
            Some(time) => time_dirs.push(TimeDir { time, name, path }),
            None => debug!("Skipping non time-step directory {}", name),
        }
    }

    time_dirs.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(time_dirs)
}
