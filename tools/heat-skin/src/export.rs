//! Export command - write solver input files without running the solver

use anyhow::{Context, Result};
use clap::Args;
use heat_skin_core::export::name_order;
use heat_skin_core::{export_geometry, GeometryExport, JobWorkspace};
use std::path::PathBuf;

use crate::manifest::{manifest_dir, SkinManifest};
use crate::scene::{load_scene, FileArmature, FileMesh};

/// Arguments for the export command
#[derive(Args)]
pub struct ExportArgs {
    /// Path to skin.toml manifest
    #[arg(default_value = "skin.toml")]
    pub manifest: PathBuf,

    /// Output directory (overrides manifest solver.work_dir)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

/// Execute the export command
pub fn execute(args: ExportArgs) -> Result<()> {
    let manifest = SkinManifest::load(&args.manifest)?;
    manifest.validate()?;
    let dir = manifest_dir(&args.manifest);

    let (meshes, armature) = load_scene(&manifest, &dir)?;
    let geometry = export_scene(&meshes, &armature)?;

    let work_dir = args
        .dir
        .unwrap_or_else(|| manifest.work_dir(&args.manifest));
    let workspace = JobWorkspace::new(work_dir);
    workspace
        .write_inputs(&geometry)
        .context("Failed to write solver input")?;

    tracing::info!(
        "Exported {} vertices and {} bones to {}",
        geometry.layout.len(),
        geometry.bones.len(),
        workspace.dir.display()
    );
    Ok(())
}

/// Export meshes in name order, the same order a skinning job uses
pub fn export_scene(meshes: &[FileMesh], armature: &FileArmature) -> Result<GeometryExport> {
    let sorted: Vec<&FileMesh> = name_order(meshes).into_iter().map(|i| &meshes[i]).collect();
    export_geometry(&sorted, armature).context("Failed to export scene")
}
