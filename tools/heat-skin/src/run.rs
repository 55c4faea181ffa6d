//! Run command - export, solve, merge
//!
//! Drives a [`SkinningSession`] with a fixed tick, echoing solver progress
//! and writing the merged vertex groups as JSON.

use anyhow::{Context, Result};
use clap::Args;
use heat_skin_core::{JobWorkspace, RunOutcome, SkinningSession};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::manifest::{manifest_dir, SkinManifest};
use crate::scene::{load_scene, save_weights};
use crate::solver::locate_solver;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Path to skin.toml manifest
    #[arg(default_value = "skin.toml")]
    pub manifest: PathBuf,

    /// Solver executable (overrides manifest)
    #[arg(short, long)]
    pub solver: Option<PathBuf>,

    /// Output JSON file (default: <manifest stem>-weights.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Cancel the job after this many seconds; nothing is written
    #[arg(short, long)]
    pub timeout: Option<f64>,
}

/// Execute the run command
pub fn execute(args: RunArgs) -> Result<()> {
    let manifest = SkinManifest::load(&args.manifest)?;
    manifest.validate()?;
    let dir = manifest_dir(&args.manifest);

    let solver = locate_solver(
        args.solver.as_deref(),
        manifest.solver.path.as_deref(),
        &dir,
    )?;
    let (mut meshes, armature) = load_scene(&manifest, &dir)?;

    let workspace = JobWorkspace::new(manifest.work_dir(&args.manifest));
    let mut session = SkinningSession::new(solver, workspace, manifest.settings.clone())
        .with_solver_prefix(manifest.solver.args.iter().cloned());

    session
        .start(&meshes, &armature)
        .context("Failed to start skinning job")?;

    let timeout = args.timeout.map(Duration::from_secs_f64);
    let started = Instant::now();
    let outcome = session
        .run_to_completion(
            &mut meshes,
            TICK_INTERVAL,
            || timeout.is_some_and(|t| started.elapsed() >= t),
            |line| println!("{line}"),
        )
        .context("Skinning job failed")?;

    let report = match outcome {
        RunOutcome::Completed(report) => report,
        RunOutcome::Cancelled => {
            anyhow::bail!(
                "Skinning cancelled after {:.1}s, no weights written",
                started.elapsed().as_secs_f64()
            )
        }
    };

    if !report.merge.warnings.is_empty() {
        println!(
            "{} weight records were dropped (see log)",
            report.merge.warnings.len()
        );
    }

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.manifest));
    save_weights(&output, &meshes)?;

    println!("{report}");
    Ok(())
}

/// `<manifest stem>-weights.json` next to the manifest
fn default_output(manifest: &Path) -> PathBuf {
    let stem = manifest
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("skin");
    manifest.with_file_name(format!("{stem}-weights.json"))
}
