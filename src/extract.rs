use crate::config::{FieldKind, PRESSURE_FILE, VELOCITY_FILE};
use crate::io::csv::write_case_data;
use crate::io::field::read_field_file;
use crate::io::forces::collect_force_coefficients;
use crate::series::{CaseData, DragEstimate};
use crate::time_dirs::list_time_dirs;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Assembles velocity, pressure and force-coefficient series for a case.
///
/// Each field keeps its own time axis: a step only lands on the velocity
/// axis if its `U` dump had data, and likewise for `p`. A case without any
/// time-step directories yields empty series.
pub fn extract_case(case_dir: &Path, drag: &DragEstimate) -> Result<CaseData> {
    info!("Extracting data from {:?}", case_dir);
    let time_dirs = list_time_dirs(case_dir)?;
    let mut data = CaseData::default();

    if time_dirs.is_empty() {
        warn!(
            "No time directories found in {:?}. Make sure the simulation has been run.",
            case_dir
        );
        return Ok(data);
    }
    debug!(
        "Found time directories: {:?}",
        time_dirs.iter().map(|d| d.name.as_str()).collect::<Vec<_>>()
    );

    let pb = ProgressBar::new(time_dirs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps ({eta})")?
            .progress_chars("#>-"),
    );

    for step in &time_dirs {
        if let Some(velocities) = read_step_field(&step.path.join(VELOCITY_FILE), FieldKind::Vector) {
            let expected = data.velocity.node_count();
            if !data.velocity.push_step(step.time, &velocities) {
                warn!(
                    "Velocity at time {} has {} nodes, expected {}; columns will not align",
                    step.name,
                    velocities.len(),
                    expected
                );
            }
        }

        if let Some(pressures) = read_step_field(&step.path.join(PRESSURE_FILE), FieldKind::Scalar) {
            let expected = data.pressure.node_count();
            if !data.pressure.push_step(step.time, &pressures) {
                warn!(
                    "Pressure at time {} has {} nodes, expected {}; columns will not align",
                    step.name,
                    pressures.len(),
                    expected
                );
            }
            if let Some(cd) = drag.coefficient(&pressures) {
                data.drag_estimate.push(step.time, cd);
            }
        }

        pb.inc(1);
    }
    pb.finish_and_clear();

    data.forces = collect_force_coefficients(&time_dirs);

    if data.velocity.step_count() != data.pressure.step_count() {
        warn!(
            "Velocity and pressure have different time axes ({} vs {} steps)",
            data.velocity.step_count(),
            data.pressure.step_count()
        );
    }
    info!(
        "Velocity: {} steps x {} nodes, pressure: {} steps x {} nodes, force coefficients: {} steps",
        data.velocity.step_count(),
        data.velocity.node_count(),
        data.pressure.step_count(),
        data.pressure.node_count(),
        data.forces.len()
    );

    Ok(data)
}

/// Extracts a case and writes its tables under `output_dir`.
pub fn extract_to_dir(
    case_dir: &Path,
    output_dir: &Path,
    drag: &DragEstimate,
) -> Result<Vec<PathBuf>> {
    let data = extract_case(case_dir, drag)?;
    let written = write_case_data(output_dir, &data)?;
    for path in &written {
        info!("Saved {:?}", path);
    }
    Ok(written)
}

// Missing, unreadable or empty dumps all count as "no data for this step"
fn read_step_field(path: &Path, kind: FieldKind) -> Option<Vec<f64>> {
    if !path.is_file() {
        debug!("No {:?} file at {:?}", kind, path);
        return None;
    }

    match read_field_file(path, kind) {
        Ok(values) if values.is_empty() => {
            debug!("No data in {:?}", path);
            None
        }
        Ok(values) => Some(values),
        Err(e) => {
            warn!("{:#}", e);
            None
        }
    }
}
