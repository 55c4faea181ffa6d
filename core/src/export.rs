//! Geometry capture for the solver
//!
//! Reads meshes and the armature through the host traits and produces the
//! world-space records that the mesh and bone files are written from.

use glam::Vec3;
use hashbrown::HashSet;

use crate::error::{Result, SkinError};
use crate::layout::VertexLayout;
use crate::scene::{SkinArmature, SkinMesh};

/// World-space copy of one mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshExport {
    pub name: String,
    /// Native vertex order
    pub positions: Vec<Vec3>,
    /// Local vertex indices, offset to global indices when written
    pub polygons: Vec<Vec<u32>>,
}

/// World-space copy of one deforming bone.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneExport {
    pub name: String,
    pub head: Vec3,
    pub tail: Vec3,
}

/// Everything the solver consumes for one job.
#[derive(Debug, Clone)]
pub struct GeometryExport {
    pub meshes: Vec<MeshExport>,
    pub bones: Vec<BoneExport>,
    pub layout: VertexLayout,
}

/// Indices of `meshes` sorted by name (stable for equal names).
pub fn name_order<M: SkinMesh>(meshes: &[M]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..meshes.len()).collect();
    order.sort_by(|&a, &b| meshes[a].name().cmp(meshes[b].name()));
    order
}

/// Capture meshes (in the given order) and the armature's deforming bones.
pub fn export_geometry<M, A>(meshes: &[&M], armature: &A) -> Result<GeometryExport>
where
    M: SkinMesh,
    A: SkinArmature,
{
    if meshes.is_empty() {
        return Err(SkinError::EmptySelection);
    }
    let mut names = HashSet::new();
    if let Some(mesh) = meshes.iter().find(|mesh| !names.insert(mesh.name())) {
        return Err(SkinError::DuplicateMesh(mesh.name().to_string()));
    }

    let meshes = meshes
        .iter()
        .map(|mesh| export_mesh(*mesh))
        .collect::<Result<Vec<_>>>()?;
    let bones = export_bones(armature)?;
    let layout = VertexLayout::from_counts(meshes.iter().map(|m| m.positions.len()));

    tracing::debug!(
        "Captured {} meshes ({} vertices), {} deforming bones",
        meshes.len(),
        layout.len(),
        bones.len()
    );

    Ok(GeometryExport {
        meshes,
        bones,
        layout,
    })
}

/// Capture one mesh in world space.
pub fn export_mesh<M: SkinMesh>(mesh: &M) -> Result<MeshExport> {
    let name = mesh.name().to_string();
    let local = mesh
        .local_positions()
        .ok_or_else(|| SkinError::UnreadableMesh(name.clone()))?;

    let matrix = mesh.world_matrix();
    let positions: Vec<Vec3> = local.iter().map(|p| matrix.transform_point3(*p)).collect();

    let polygons = mesh.polygons();
    for (polygon, indices) in polygons.iter().enumerate() {
        if let Some(&vertex) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(SkinError::InvalidPolygon {
                mesh: name,
                polygon,
                vertex,
                vertex_count: positions.len(),
            });
        }
    }

    Ok(MeshExport {
        name,
        positions,
        polygons,
    })
}

/// Capture the deforming bones in armature order.
pub fn export_bones<A: SkinArmature>(armature: &A) -> Result<Vec<BoneExport>> {
    let matrix = armature.world_matrix();

    let bones = armature
        .bones()
        .into_iter()
        .filter(|bone| bone.deform)
        .map(|bone| {
            if bone.name.contains([',', '\n', '\r']) {
                return Err(SkinError::InvalidBoneName(bone.name));
            }
            Ok(BoneExport {
                head: matrix.transform_point3(bone.head),
                tail: matrix.transform_point3(bone.tail),
                name: bone.name,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if bones.is_empty() {
        return Err(SkinError::NoDeformBones);
    }

    Ok(bones)
}
