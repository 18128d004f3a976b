use crate::config::OutputTable;
use crate::series::{CaseData, DragSeries, FieldSeries, ForceCoefficients};
use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Shortest text that parses back to `value`. Magnitudes outside
/// `[1e-4, 1e16)` switch to exponent form, so `1e-20` stays short.
pub fn format_float(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 || (1e-4..1e16).contains(&magnitude) {
        value.to_string()
    } else {
        format!("{:e}", value)
    }
}

// Create CSV writer with headers, creating parent directories as needed
fn create_csv_writer(path: &Path, header: &[String]) -> Result<Writer<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }

    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    wtr.write_record(header)?;

    Ok(wtr)
}

/// Writes `Time,Node_0,Node_1,...` with one row per entry of `series.times`.
///
/// Columns are not checked against the time axis: a node with fewer samples
/// than there are times gets empty cells in the trailing rows. Returns
/// `false` without touching the filesystem when the series is empty.
pub fn write_field_series(path: &Path, series: &FieldSeries) -> Result<bool> {
    if series.is_empty() {
        debug!("No samples for {:?}, skipping", path);
        return Ok(false);
    }

    let header: Vec<String> = std::iter::once("Time".to_string())
        .chain((0..series.node_count()).map(|idx| format!("Node_{}", idx)))
        .collect();
    let mut wtr = create_csv_writer(path, &header)?;

    for (step, time) in series.times.iter().enumerate() {
        let mut record = Vec::with_capacity(series.node_count() + 1);
        record.push(format_float(*time));
        for node in 0..series.node_count() {
            record.push(
                series
                    .value(node, step)
                    .map(format_float)
                    .unwrap_or_default(),
            );
        }
        wtr.write_record(&record)?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(true)
}

pub fn write_force_coefficients(path: &Path, forces: &ForceCoefficients) -> Result<bool> {
    if forces.is_empty() {
        debug!("No force coefficients, skipping {:?}", path);
        return Ok(false);
    }

    let header = ["Time", "Drag_Coefficient", "Lift_Coefficient"].map(String::from);
    let mut wtr = create_csv_writer(path, &header)?;
    for ((time, drag), lift) in forces.times.iter().zip(&forces.drag).zip(&forces.lift) {
        wtr.write_record(&[format_float(*time), format_float(*drag), format_float(*lift)])?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(true)
}

pub fn write_drag_estimate(path: &Path, drag: &DragSeries) -> Result<bool> {
    if drag.is_empty() {
        debug!("No drag estimate, skipping {:?}", path);
        return Ok(false);
    }

    let header = ["Time", "Drag_Coefficient"].map(String::from);
    let mut wtr = create_csv_writer(path, &header)?;
    for (time, cd) in drag.times.iter().zip(&drag.drag) {
        wtr.write_record(&[format_float(*time), format_float(*cd)])?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(true)
}

/// Writes every non-empty table of a case under `output_dir` and returns the
/// paths that were written.
pub fn write_case_data(output_dir: &Path, data: &CaseData) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let velocity_path = output_dir.join(OutputTable::Velocity.relative_path());
    if write_field_series(&velocity_path, &data.velocity)? {
        written.push(velocity_path);
    }

    let pressure_path = output_dir.join(OutputTable::Pressure.relative_path());
    if write_field_series(&pressure_path, &data.pressure)? {
        written.push(pressure_path);
    }

    let forces_path = output_dir.join(OutputTable::Forces.relative_path());
    if write_force_coefficients(&forces_path, &data.forces)? {
        written.push(forces_path);
    }

    let drag_path = output_dir.join(OutputTable::Drag.relative_path());
    if write_drag_estimate(&drag_path, &data.drag_estimate)? {
        written.push(drag_path);
    }

    Ok(written)
}
