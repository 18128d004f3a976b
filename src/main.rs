use anyhow::{Context, Result};
use tracing::Level;

mod batch;
mod cli;
mod config;
mod dictionary;
mod extract;
mod io;
mod run;
mod series;
mod time_dirs;
mod visualize;

use batch::{BatchConfig, SubprocessLauncher, run_batch};
use cli::{BatchArgs, Commands, ExtractArgs, RunArgs, get_args};
use extract::extract_to_dir;
use run::{SystemTools, run_case};
use series::DragEstimate;

fn main() -> Result<()> {
    let cli = get_args();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Extract(args) => cmd_extract(args),
        Commands::Run(args) => cmd_run(args),
        Commands::Batch(args) => cmd_batch(args),
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn cmd_extract(args: ExtractArgs) -> Result<()> {
    let written = extract_to_dir(&args.case_dir, &args.output_dir, &DragEstimate::default())?;

    if written.is_empty() {
        println!("No data extracted from {}", args.case_dir.display());
    }
    for path in written {
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let work_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    let config = args.into_config(&work_dir);

    let outcome = run_case(&config, &SystemTools)?;

    println!("\nRun complete (nu = {} m²/s)", outcome.nu);
    if let Some(video) = &outcome.video {
        println!("  Video: {}", video.display());
    }
    for path in &outcome.written {
        println!("  Saved {}", path.display());
    }
    Ok(())
}

fn cmd_batch(args: BatchArgs) -> Result<()> {
    let work_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    let exe = std::env::current_exe().context("Failed to locate own executable")?;

    let mut launcher = SubprocessLauncher {
        exe,
        case_dir: args.case_dir.clone(),
        work_dir,
        media_dir: args.media_dir,
        end_time: args.end_time,
        delta_t: args.delta_t,
        velocity: args.velocity,
    };
    let config = BatchConfig {
        manifest: args.manifest,
        case_dir: args.case_dir,
        output_dir: args.output_dir,
        velocity: args.velocity,
    };

    let summary = run_batch(&config, &mut launcher)?;

    println!("\n{}", summary.report());
    for run in summary.runs.iter().filter(|r| r.error.is_some()) {
        println!(
            "  run {} (Re={}, nu={}) failed: {}",
            run.index,
            run.reynolds,
            run.nu,
            run.error.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}
