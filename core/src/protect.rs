//! Protected vertex weights
//!
//! Protection is a two-phase transaction around the merge: the selected
//! vertices and their weights are captured when the job starts, solver
//! records for those vertices are skipped, and the captured weights are
//! written back after every record has been applied.

use hashbrown::HashSet;

use crate::scene::SkinMesh;

#[derive(Debug, Clone, Default)]
struct ProtectedMesh {
    vertices: HashSet<u32>,
    /// (group, local vertex, weight)
    weights: Vec<(String, u32, f32)>,
}

/// Selected vertices and their pre-job weights, per mesh in export order.
#[derive(Debug, Clone, Default)]
pub struct ProtectionSnapshot {
    meshes: Vec<ProtectedMesh>,
}

impl ProtectionSnapshot {
    /// Capture the current selection of each mesh (export order).
    pub fn capture<M: SkinMesh>(meshes: &[&M]) -> Self {
        let meshes: Vec<ProtectedMesh> = meshes
            .iter()
            .map(|mesh| {
                let vertices: HashSet<u32> = mesh.selected_vertices().into_iter().collect();
                let mut selected: Vec<u32> = vertices.iter().copied().collect();
                selected.sort_unstable();

                let weights = selected
                    .iter()
                    .flat_map(|&vertex| {
                        mesh.vertex_weights(vertex)
                            .into_iter()
                            .map(move |(group, weight)| (group, vertex, weight))
                    })
                    .collect();

                ProtectedMesh { vertices, weights }
            })
            .collect();

        let snapshot = Self { meshes };
        tracing::debug!(
            "Protecting {} vertices ({} weights)",
            snapshot.vertex_count(),
            snapshot.weight_count()
        );
        snapshot
    }

    /// Whether a mesh-local vertex is protected.
    pub fn is_protected(&self, mesh: usize, vertex: u32) -> bool {
        self.meshes
            .get(mesh)
            .is_some_and(|m| m.vertices.contains(&vertex))
    }

    /// Number of protected vertices over all meshes
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    /// Number of captured (group, vertex, weight) entries
    pub fn weight_count(&self) -> usize {
        self.meshes.iter().map(|m| m.weights.len()).sum()
    }

    /// Write every captured weight back, replacing whatever the merge set.
    ///
    /// `meshes` must be in the same order as at capture. Returns the number
    /// of weights restored.
    pub fn restore<M: SkinMesh>(self, meshes: &mut [&mut M]) -> usize {
        let mut restored = 0;
        for (protected, mesh) in self.meshes.into_iter().zip(meshes.iter_mut()) {
            for (group, vertex, weight) in protected.weights {
                mesh.set_weight(&group, vertex, weight);
                restored += 1;
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestMesh;

    #[test]
    fn test_capture_selected_weights() {
        let mut mesh = TestMesh::grid("Body", 4);
        mesh.selected = vec![1, 3];
        mesh.set_weight("Hips", 1, 0.5);
        mesh.set_weight("Spine", 1, 0.25);
        mesh.set_weight("Hips", 2, 1.0);

        let snapshot = ProtectionSnapshot::capture(&[&mesh]);

        assert_eq!(snapshot.vertex_count(), 2);
        assert_eq!(snapshot.weight_count(), 2);
        assert!(snapshot.is_protected(0, 1));
        assert!(snapshot.is_protected(0, 3));
        assert!(!snapshot.is_protected(0, 2));
        assert!(!snapshot.is_protected(1, 1));
    }

    #[test]
    fn test_restore_overwrites() {
        let mut mesh = TestMesh::grid("Body", 3);
        mesh.selected = vec![0];
        mesh.set_weight("Hips", 0, 0.4);

        let snapshot = ProtectionSnapshot::capture(&[&mesh]);

        mesh.replace_group("Hips");
        mesh.set_weight("Hips", 0, 0.9);

        let restored = snapshot.restore(&mut [&mut mesh]);
        assert_eq!(restored, 1);
        assert_eq!(mesh.weight("Hips", 0), Some(0.4));
    }

    #[test]
    fn test_unselected_mesh_captures_nothing() {
        let a = TestMesh::grid("A", 3);
        let mut b = TestMesh::grid("B", 3);
        b.selected = vec![2];

        let snapshot = ProtectionSnapshot::capture(&[&a, &b]);
        assert!(!snapshot.is_protected(0, 2));
        assert!(snapshot.is_protected(1, 2));
        assert_eq!(snapshot.weight_count(), 0);
    }
}
