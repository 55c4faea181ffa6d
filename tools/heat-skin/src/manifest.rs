//! skin.toml manifest parsing

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use hashbrown::HashSet;
use heat_skin_core::{BoneSpec, SolverSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// skin.toml manifest structure
#[derive(Debug, Deserialize)]
pub struct SkinManifest {
    #[serde(default)]
    pub solver: SolverSection,
    #[serde(default)]
    pub settings: SolverSettings,
    pub meshes: Vec<MeshEntry>,
    pub armature: ArmatureEntry,
}

/// Solver location and working directory
#[derive(Debug, Default, Deserialize)]
pub struct SolverSection {
    /// Solver executable, relative to the manifest or a name on PATH
    pub path: Option<PathBuf>,
    /// Arguments placed before the solver's own (e.g. a script for an interpreter)
    #[serde(default)]
    pub args: Vec<String>,
    /// Directory for the interchange files, relative to the manifest.
    /// Default: `.heat-skin/<manifest stem>` next to the manifest
    pub work_dir: Option<PathBuf>,
}

/// One mesh to skin
#[derive(Debug, Deserialize)]
pub struct MeshEntry {
    pub name: String,
    /// OBJ file, relative to the manifest
    pub path: PathBuf,
    /// Object-to-world matrix, column-major
    #[serde(default)]
    pub transform: Option<[f32; 16]>,
    /// Selected vertex indices (protected when `protect_selected` is set)
    #[serde(default)]
    pub selected: Vec<u32>,
    /// Existing vertex groups as JSON
    #[serde(default)]
    pub weights: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct ArmatureEntry {
    #[serde(default)]
    pub transform: Option<[f32; 16]>,
    pub bones: Vec<BoneEntry>,
}

#[derive(Debug, Deserialize)]
pub struct BoneEntry {
    pub name: String,
    pub head: [f32; 3],
    pub tail: [f32; 3],
    #[serde(default = "default_deform")]
    pub deform: bool,
}

fn default_deform() -> bool {
    true
}

impl BoneEntry {
    pub fn to_spec(&self) -> BoneSpec {
        BoneSpec {
            name: self.name.clone(),
            head: Vec3::from_array(self.head),
            tail: Vec3::from_array(self.tail),
            deform: self.deform,
        }
    }
}

/// Directory relative manifest paths are resolved against
pub fn manifest_dir(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Matrix from an optional column-major array, identity when absent.
pub fn matrix(transform: Option<[f32; 16]>) -> Mat4 {
    transform
        .map(|cols| Mat4::from_cols_array(&cols))
        .unwrap_or(Mat4::IDENTITY)
}

impl SkinManifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse skin.toml")
    }

    /// Validate manifest fields
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;

        if self.meshes.is_empty() {
            anyhow::bail!("No meshes listed in skin.toml");
        }

        let mut names = HashSet::new();
        for mesh in &self.meshes {
            if !names.insert(mesh.name.as_str()) {
                anyhow::bail!("Duplicate mesh name '{}' in skin.toml", mesh.name);
            }
        }

        if !self.armature.bones.iter().any(|b| b.deform) {
            anyhow::bail!("Armature in skin.toml has no deforming bones");
        }

        Ok(())
    }

    /// Interchange directory of the manifest at `manifest_path`
    ///
    /// Each manifest gets its own default directory, so runs of different
    /// manifests never share interchange files.
    pub fn work_dir(&self, manifest_path: &Path) -> PathBuf {
        let base = manifest_dir(manifest_path);
        match &self.solver.work_dir {
            Some(dir) => base.join(dir),
            None => {
                let stem = manifest_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("skin");
                base.join(".heat-skin").join(stem)
            }
        }
    }
}
