//! Check command - validate a manifest without running the solver

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::export::export_scene;
use crate::manifest::{manifest_dir, SkinManifest};
use crate::scene::load_scene;
use crate::solver::locate_solver;

/// Arguments for the check command
#[derive(Args)]
pub struct CheckArgs {
    /// Path to skin.toml manifest
    #[arg(default_value = "skin.toml")]
    pub manifest: PathBuf,

    /// Solver executable (overrides manifest)
    #[arg(short, long)]
    pub solver: Option<PathBuf>,
}

/// Execute the check command
pub fn execute(args: CheckArgs) -> Result<()> {
    tracing::info!("Checking manifest {:?}", args.manifest);
    let manifest = SkinManifest::load(&args.manifest)?;
    manifest.validate()?;
    let dir = manifest_dir(&args.manifest);

    let (meshes, armature) = load_scene(&manifest, &dir)?;
    let geometry = export_scene(&meshes, &armature)?;

    let solver = locate_solver(
        args.solver.as_deref(),
        manifest.solver.path.as_deref(),
        &dir,
    )?;

    tracing::info!(
        "{} meshes, {} vertices, {} deforming bones, solver {}",
        geometry.meshes.len(),
        geometry.layout.len(),
        geometry.bones.len(),
        solver.display()
    );
    tracing::info!("Manifest is valid!");
    Ok(())
}
