use crate::config::{
    CHARACTERISTIC_LENGTH, CONTROL_DICT, NU_DIMENSIONS, SOLVER_BINARY, TRANSPORT_PROPERTIES,
    WRITE_CONTROL, WRITE_INTERVAL,
};
use crate::dictionary::edit_dictionary_file;
use crate::extract::extract_to_dir;
use crate::series::DragEstimate;
use crate::visualize::render_video;
use anyhow::{Context, Result, bail, ensure};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Launches external executables. Tests substitute a recording fake.
pub trait ToolRunner {
    fn run(&self, program: &str, args: &[&str], working_dir: &Path) -> Result<()>;
}

// Runs tools as child processes with inherited stdio
pub struct SystemTools;

impl ToolRunner for SystemTools {
    fn run(&self, program: &str, args: &[&str], working_dir: &Path) -> Result<()> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(working_dir);
        run_command(&mut cmd, program)
    }
}

/// Waits for `cmd` and turns a non-zero exit into an error naming `name`.
pub fn run_command(cmd: &mut Command, name: &str) -> Result<()> {
    info!("Running {:?}", cmd);
    let status = cmd
        .status()
        .with_context(|| format!("Failed to launch {}", name))?;
    if !status.success() {
        bail!("{} exited with {}", name, status);
    }
    Ok(())
}

// Parameters for one solver run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub case_dir: PathBuf,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
    pub end_time: f64,
    pub delta_t: f64,
    pub reynolds: f64,
    pub velocity: f64,
    pub nu: Option<f64>,
    pub render_video: bool,
    pub extract: bool,
}

impl RunConfig {
    /// Kinematic viscosity for this run: the explicit value if one was given,
    /// otherwise derived from the Reynolds number.
    pub fn viscosity(&self) -> f64 {
        self.nu
            .unwrap_or_else(|| nu_from_reynolds(self.reynolds, self.velocity, CHARACTERISTIC_LENGTH))
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.end_time > 0.0, "end time must be positive, got {}", self.end_time);
        ensure!(self.delta_t > 0.0, "time step must be positive, got {}", self.delta_t);
        ensure!(
            self.delta_t <= self.end_time,
            "time step {} exceeds end time {}",
            self.delta_t,
            self.end_time
        );
        match self.nu {
            Some(nu) => ensure!(nu > 0.0, "viscosity must be positive, got {}", nu),
            None => ensure!(
                self.reynolds > 0.0,
                "Reynolds number must be positive, got {}",
                self.reynolds
            ),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub nu: f64,
    pub video: Option<PathBuf>,
    pub written: Vec<PathBuf>,
}

pub fn nu_from_reynolds(reynolds: f64, velocity: f64, characteristic_length: f64) -> f64 {
    velocity * characteristic_length / reynolds
}

/// Sets viscosity in `constant/transportProperties` and the time controls in
/// `system/controlDict`.
pub fn patch_case(case_dir: &Path, nu: f64, end_time: f64, delta_t: f64) -> Result<()> {
    edit_dictionary_file(
        &case_dir.join(TRANSPORT_PROPERTIES),
        &[("nu", format!("{} {}", NU_DIMENSIONS, nu))],
    )?;
    edit_dictionary_file(
        &case_dir.join(CONTROL_DICT),
        &[
            ("endTime", end_time.to_string()),
            ("deltaT", delta_t.to_string()),
            ("writeControl", WRITE_CONTROL.to_string()),
            ("writeInterval", WRITE_INTERVAL.to_string()),
        ],
    )?;
    Ok(())
}

/// Prepares the case, runs the solver, then optionally renders a video and
/// extracts the results.
pub fn run_case(config: &RunConfig, tools: &dyn ToolRunner) -> Result<RunOutcome> {
    config.validate()?;

    let nu = config.viscosity();
    info!("Kinematic viscosity: {} m²/s", nu);

    patch_case(&config.case_dir, nu, config.end_time, config.delta_t)?;

    info!(
        "Running simulation with Re={}, U={}, endTime={}, deltaT={}",
        config.reynolds, config.velocity, config.end_time, config.delta_t
    );
    tools
        .run(SOLVER_BINARY, &[], &config.case_dir)
        .context("Simulation failed")?;
    info!("Simulation completed successfully");

    let video = if config.render_video {
        render_video(&config.case_dir, &config.work_dir, tools)?
    } else {
        None
    };

    let written = if config.extract {
        let drag = DragEstimate::with_inlet_velocity(config.velocity);
        extract_to_dir(&config.case_dir, &config.output_dir, &drag)?
    } else {
        Vec::new()
    };

    Ok(RunOutcome { nu, video, written })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    // Records every invocation and fails the ones named in `failing`
    #[derive(Default)]
    pub(crate) struct FakeTools {
        pub calls: RefCell<Vec<String>>,
        pub failing: Vec<&'static str>,
    }

    impl ToolRunner for FakeTools {
        fn run(&self, program: &str, args: &[&str], _working_dir: &Path) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" "));
            if self.failing.contains(&program) {
                bail!("{} exited with exit status: 1", program);
            }
            Ok(())
        }
    }

    pub(crate) fn write_case(root: &Path) -> PathBuf {
        let case = root.join("flow_cylinder");
        fs::create_dir_all(case.join("system")).expect("mkdir system");
        fs::create_dir_all(case.join("constant")).expect("mkdir constant");
        fs::write(
            case.join(CONTROL_DICT),
            "FoamFile\n{\n    object controlDict;\n}\napplication icoFoam;\nstopAt endTime;\nendTime 1;\ndeltaT 0.001;\nwriteControl timeStep;\nwriteInterval 100;\n",
        )
        .expect("write controlDict");
        fs::write(
            case.join(TRANSPORT_PROPERTIES),
            "transportModel Newtonian;\nnu [0 2 -1 0 0 0 0] 0.01;\n",
        )
        .expect("write transportProperties");

        let step = case.join("0.1");
        fs::create_dir_all(&step).expect("mkdir step");
        fs::write(step.join("U"), "(\n(0 3 4)\n(1 0 0)\n)\n").expect("write U");
        fs::write(step.join("p"), "(\n0.5\n-0.5\n)\n").expect("write p");
        case
    }

    fn config(root: &Path, case_dir: PathBuf) -> RunConfig {
        RunConfig {
            case_dir,
            output_dir: root.join("data"),
            work_dir: root.to_path_buf(),
            end_time: 2.0,
            delta_t: 0.01,
            reynolds: 100.0,
            velocity: 1.0,
            nu: None,
            render_video: false,
            extract: true,
        }
    }

    #[test]
    fn viscosity_from_reynolds_or_override() {
        assert!((nu_from_reynolds(100.0, 1.0, 0.01) - 1e-4).abs() < 1e-18);

        let tmp = TempDir::new().expect("tempdir");
        let mut cfg = config(tmp.path(), tmp.path().to_path_buf());
        assert!((cfg.viscosity() - 1e-4).abs() < 1e-18);
        cfg.nu = Some(2e-5);
        assert_eq!(cfg.viscosity(), 2e-5);
    }

    #[test]
    fn patch_case_updates_dictionaries() {
        let tmp = TempDir::new().expect("tempdir");
        let case = write_case(tmp.path());
        patch_case(&case, 0.0001, 2.5, 0.005).expect("patch");

        let control = fs::read_to_string(case.join(CONTROL_DICT)).expect("read");
        assert!(control.contains("stopAt endTime;"));
        assert!(control.contains("endTime 2.5;"));
        assert!(control.contains("deltaT 0.005;"));
        assert!(control.contains("writeControl runTime;"));
        assert!(control.contains("writeInterval 0.1;"));
        assert!(control.contains("object controlDict;"));

        let transport = fs::read_to_string(case.join(TRANSPORT_PROPERTIES)).expect("read");
        assert!(transport.contains("nu [0 2 -1 0 0 0 0] 0.0001;"));
    }

    #[test]
    fn run_case_runs_solver_then_extracts() {
        let tmp = TempDir::new().expect("tempdir");
        let case = write_case(tmp.path());
        let tools = FakeTools::default();

        let outcome = run_case(&config(tmp.path(), case), &tools).expect("run");

        assert_eq!(*tools.calls.borrow(), vec![SOLVER_BINARY.to_string()]);
        assert_eq!(outcome.video, None);
        assert_eq!(outcome.written.len(), 3);

        let velocity = fs::read_to_string(tmp.path().join("data/velocity/data.csv")).expect("read");
        assert_eq!(velocity, "Time,Node_0,Node_1\n0.1,5,1\n");
    }

    #[test]
    fn solver_failure_stops_the_run() {
        let tmp = TempDir::new().expect("tempdir");
        let case = write_case(tmp.path());
        let tools = FakeTools {
            failing: vec![SOLVER_BINARY],
            ..FakeTools::default()
        };

        let err = run_case(&config(tmp.path(), case), &tools).unwrap_err();
        assert!(format!("{:#}", err).contains("Simulation failed"));
        assert!(!tmp.path().join("data").exists());
    }

    #[test]
    fn rejects_invalid_parameters() {
        let tmp = TempDir::new().expect("tempdir");
        let case = write_case(tmp.path());
        let tools = FakeTools::default();

        let mut cfg = config(tmp.path(), case);
        cfg.reynolds = 0.0;
        assert!(run_case(&cfg, &tools).is_err());
        assert!(tools.calls.borrow().is_empty());
    }
}
