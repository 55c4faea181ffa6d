//! File-backed meshes and armature
//!
//! Vertex groups live in `BTreeMap`s so the JSON output has sorted keys.

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use heat_skin_core::{BoneSpec, SkinArmature, SkinMesh};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::manifest::{matrix, ArmatureEntry, MeshEntry, SkinManifest};
use crate::obj::{load_obj, ObjMesh};

/// Group name → vertex index → weight
pub type VertexGroups = BTreeMap<String, BTreeMap<u32, f32>>;

/// A mesh loaded from an OBJ file plus its vertex groups
#[derive(Debug, Clone)]
pub struct FileMesh {
    pub name: String,
    pub transform: Mat4,
    pub obj: ObjMesh,
    pub selected: Vec<u32>,
    pub groups: VertexGroups,
}

impl FileMesh {
    /// Load the OBJ and existing groups of a manifest entry
    pub fn load(entry: &MeshEntry, manifest_dir: &Path) -> Result<Self> {
        let obj = load_obj(&manifest_dir.join(&entry.path))?;
        let groups = match &entry.weights {
            Some(path) => load_groups(&manifest_dir.join(path))?,
            None => VertexGroups::new(),
        };

        Ok(Self {
            name: entry.name.clone(),
            transform: matrix(entry.transform),
            obj,
            selected: entry.selected.clone(),
            groups,
        })
    }
}

impl SkinMesh for FileMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn world_matrix(&self) -> Mat4 {
        self.transform
    }

    fn local_positions(&self) -> Option<Vec<Vec3>> {
        Some(self.obj.positions.clone())
    }

    fn polygons(&self) -> Vec<Vec<u32>> {
        self.obj.polygons.clone()
    }

    fn selected_vertices(&self) -> Vec<u32> {
        self.selected.clone()
    }

    fn vertex_weights(&self, vertex: u32) -> Vec<(String, f32)> {
        self.groups
            .iter()
            .filter_map(|(group, weights)| weights.get(&vertex).map(|&w| (group.clone(), w)))
            .collect()
    }

    fn replace_group(&mut self, name: &str) {
        self.groups.insert(name.to_string(), BTreeMap::new());
    }

    fn set_weight(&mut self, group: &str, vertex: u32, weight: f32) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(vertex, weight);
    }
}

/// Armature declared in the manifest
#[derive(Debug, Clone)]
pub struct FileArmature {
    pub transform: Mat4,
    pub bones: Vec<BoneSpec>,
}

impl FileArmature {
    pub fn from_entry(entry: &ArmatureEntry) -> Self {
        Self {
            transform: matrix(entry.transform),
            bones: entry.bones.iter().map(|b| b.to_spec()).collect(),
        }
    }
}

impl SkinArmature for FileArmature {
    fn world_matrix(&self) -> Mat4 {
        self.transform
    }

    fn bones(&self) -> Vec<BoneSpec> {
        self.bones.clone()
    }
}

/// Load every mesh and the armature of a manifest
pub fn load_scene(
    manifest: &SkinManifest,
    manifest_dir: &Path,
) -> Result<(Vec<FileMesh>, FileArmature)> {
    let meshes = manifest
        .meshes
        .iter()
        .map(|entry| FileMesh::load(entry, manifest_dir))
        .collect::<Result<Vec<_>>>()?;
    Ok((meshes, FileArmature::from_entry(&manifest.armature)))
}

/// Read `{ "<group>": { "<vertex>": weight } }`
pub fn load_groups(path: &Path) -> Result<VertexGroups> {
    let file = File::open(path).with_context(|| format!("Failed to open weights: {:?}", path))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse weights: {:?}", path))
}

/// Write `{ "<mesh>": { "<group>": { "<vertex>": weight } } }`
pub fn save_weights(path: &Path, meshes: &[FileMesh]) -> Result<()> {
    let by_mesh: BTreeMap<&str, &VertexGroups> =
        meshes.iter().map(|m| (m.name.as_str(), &m.groups)).collect();

    let file =
        File::create(path).with_context(|| format!("Failed to create output: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &by_mesh)
        .with_context(|| format!("Failed to write weights: {:?}", path))?;
    writeln!(writer)?;
    writer.flush()?;

    tracing::info!("Wrote weights for {} meshes to {:?}", meshes.len(), path);
    Ok(())
}
