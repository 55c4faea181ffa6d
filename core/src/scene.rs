//! Host application interface
//!
//! The authoring tool owns meshes, skeletons and vertex groups. A skinning
//! job only needs the narrow view defined here: read access to geometry,
//! selection and existing weights, plus a replace-style weight setter.

use glam::{Mat4, Vec3};

/// A deformable mesh in the host application.
pub trait SkinMesh {
    /// Object name. Meshes are exported in name order, so names should be
    /// unique within one job.
    fn name(&self) -> &str;

    /// Object-to-world transform applied to [`local_positions`](Self::local_positions).
    fn world_matrix(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    /// Vertex positions in object space, in the mesh's native order.
    ///
    /// `None` means the position data is unavailable, which aborts the job.
    fn local_positions(&self) -> Option<Vec<Vec3>>;

    /// Polygons as ordered lists of local vertex indices (winding order).
    fn polygons(&self) -> Vec<Vec<u32>>;

    /// Local indices of the currently selected vertices.
    fn selected_vertices(&self) -> Vec<u32>;

    /// Existing `(group name, weight)` pairs of one vertex.
    fn vertex_weights(&self, vertex: u32) -> Vec<(String, f32)>;

    /// Delete the named group if it exists and create it again, empty.
    fn replace_group(&mut self, name: &str);

    /// Set one vertex's weight in a group, replacing any previous value.
    ///
    /// Creates the group if it does not exist.
    fn set_weight(&mut self, group: &str, vertex: u32, weight: f32);
}

/// One bone of an armature, in armature space.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneSpec {
    pub name: String,
    pub head: Vec3,
    pub tail: Vec3,
    /// Only deforming bones are handed to the solver
    pub deform: bool,
}

impl BoneSpec {
    pub fn new(name: impl Into<String>, head: Vec3, tail: Vec3) -> Self {
        Self {
            name: name.into(),
            head,
            tail,
            deform: true,
        }
    }
}

/// The skeleton driving the meshes.
pub trait SkinArmature {
    /// Armature-to-world transform applied to bone heads and tails.
    fn world_matrix(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    /// All bones in armature order.
    fn bones(&self) -> Vec<BoneSpec>;
}
