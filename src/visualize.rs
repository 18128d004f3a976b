use crate::config::{
    ENCODER_BINARY, FRAMES_DIR, RENDER_BINARY, RENDER_SCRIPT, VIDEO_FILE, VIDEO_FRAMERATE,
};
use crate::run::ToolRunner;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const RENDER_TEMPLATE: &str = include_str!("templates/render_frames.py");

/// Renders one frame per time step with ParaView and encodes them into
/// `VIDEO_FILE` inside `work_dir`.
///
/// A rendering failure is an error. An encoding failure is only logged: the
/// frames are left in place and `None` is returned.
pub fn render_video(
    case_dir: &Path,
    work_dir: &Path,
    tools: &dyn ToolRunner,
) -> Result<Option<PathBuf>> {
    let frames_dir = work_dir.join(FRAMES_DIR);
    fs::create_dir_all(&frames_dir)
        .with_context(|| format!("Failed to create frames directory: {:?}", frames_dir))?;

    let foam_file = ensure_foam_file(case_dir)?;
    let script_path = work_dir.join(RENDER_SCRIPT);
    fs::write(&script_path, render_script(&foam_file))
        .with_context(|| format!("Failed to write render script: {:?}", script_path))?;

    info!("Creating flow visualization...");
    tools
        .run(RENDER_BINARY, &[RENDER_SCRIPT], work_dir)
        .context("Frame rendering failed")?;

    let framerate = VIDEO_FRAMERATE.to_string();
    let frame_glob = format!("{}/frame_*.png", FRAMES_DIR);
    let encode_args = [
        "-y",
        "-framerate",
        framerate.as_str(),
        "-pattern_type",
        "glob",
        "-i",
        frame_glob.as_str(),
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
        "-b:v",
        "5000k",
        VIDEO_FILE,
    ];

    match tools.run(ENCODER_BINARY, &encode_args, work_dir) {
        Ok(()) => {
            if let Err(e) = fs::remove_dir_all(&frames_dir) {
                warn!("Failed to remove {:?}: {}", frames_dir, e);
            }
            if let Err(e) = fs::remove_file(&script_path) {
                warn!("Failed to remove {:?}: {}", script_path, e);
            }
            let video = work_dir.join(VIDEO_FILE);
            info!("Visualization created: {:?}", video);
            Ok(Some(video))
        }
        Err(e) => {
            warn!("Error creating video: {:#}", e);
            warn!("Frames are preserved in {:?}", frames_dir);
            Ok(None)
        }
    }
}

fn render_script(foam_file: &Path) -> String {
    RENDER_TEMPLATE
        .replace("@FOAM_FILE@", &foam_file.display().to_string())
        .replace("@FRAMES_DIR@", FRAMES_DIR)
}

// ParaView's reader opens a case through an empty `<case>.foam` marker
fn ensure_foam_file(case_dir: &Path) -> Result<PathBuf> {
    let case_dir = case_dir
        .canonicalize()
        .with_context(|| format!("Case directory not found: {:?}", case_dir))?;
    let case_name = case_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "case".to_string());

    let foam_file = case_dir.join(format!("{}.foam", case_name));
    if !foam_file.exists() {
        fs::write(&foam_file, "")
            .with_context(|| format!("Failed to create {:?}", foam_file))?;
    }
    Ok(foam_file)
}
