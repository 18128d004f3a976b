use std::path::PathBuf;

// Field dumps inside each time-step directory
pub const VELOCITY_FILE: &str = "U";
pub const PRESSURE_FILE: &str = "p";

// forceCoeffs function object state, written per time step by the solver
pub const FORCE_COEFFS_FILE: &str = "uniform/functionObjects/functionObjectProperties";
pub const DRAG_KEY: &str = "Cd";
pub const LIFT_KEY: &str = "Cl";

// Solver dictionaries edited before each run
pub const CONTROL_DICT: &str = "system/controlDict";
pub const TRANSPORT_PROPERTIES: &str = "constant/transportProperties";
pub const NU_DIMENSIONS: &str = "[0 2 -1 0 0 0 0]";
pub const WRITE_CONTROL: &str = "runTime";
pub const WRITE_INTERVAL: f64 = 0.1;

/// Cylinder diameter in metres, used to derive viscosity from a Reynolds number.
pub const CHARACTERISTIC_LENGTH: f64 = 0.01;

// External executables
pub const SOLVER_BINARY: &str = "icoFoam";
pub const RENDER_BINARY: &str = "pvbatch";
pub const ENCODER_BINARY: &str = "ffmpeg";

// Visualization artefacts, relative to the working directory
pub const RENDER_SCRIPT: &str = "visualization.py";
pub const FRAMES_DIR: &str = "frames";
pub const VIDEO_FILE: &str = "flow_visualization.mp4";
pub const VIDEO_FRAMERATE: u32 = 10;

pub const DEFAULT_CASE_DIR: &str = "flow_cylinder";
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_MEDIA_DIR: &str = "media";
pub const BATCH_SUMMARY_FILE: &str = "batch_summary.json";

// How the samples of a field dump are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Vector,
}

// Tables written for every extracted case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTable {
    Velocity,
    Pressure,
    Forces,
    Drag,
}

impl OutputTable {
    pub fn relative_path(&self) -> PathBuf {
        match self {
            OutputTable::Velocity => PathBuf::from("velocity").join("data.csv"),
            OutputTable::Pressure => PathBuf::from("pressure").join("data.csv"),
            OutputTable::Forces => PathBuf::from("forces").join("coefficients.csv"),
            OutputTable::Drag => PathBuf::from("drag").join("data.csv"),
        }
    }
}
