//! In-memory host objects for tests

use std::collections::BTreeMap;

use glam::{Mat4, Vec3};

use crate::export::BoneExport;
use crate::scene::{BoneSpec, SkinArmature, SkinMesh};

/// Mesh with weights kept in sorted maps so comparisons are deterministic.
#[derive(Debug, Clone)]
pub struct TestMesh {
    pub name: String,
    pub transform: Mat4,
    pub positions: Option<Vec<Vec3>>,
    pub polygons: Vec<Vec<u32>>,
    pub selected: Vec<u32>,
    pub groups: BTreeMap<String, BTreeMap<u32, f32>>,
}

impl TestMesh {
    /// `count` vertices along +X, one polygon over all of them when possible.
    pub fn grid(name: &str, count: u32) -> Self {
        let positions = (0..count).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let polygons = if count >= 3 {
            vec![(0..count).collect()]
        } else {
            Vec::new()
        };

        Self {
            name: name.to_string(),
            transform: Mat4::IDENTITY,
            positions: Some(positions),
            polygons,
            selected: Vec::new(),
            groups: BTreeMap::new(),
        }
    }

    pub fn weight(&self, group: &str, vertex: u32) -> Option<f32> {
        self.groups.get(group)?.get(&vertex).copied()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }
}

impl SkinMesh for TestMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn world_matrix(&self) -> Mat4 {
        self.transform
    }

    fn local_positions(&self) -> Option<Vec<Vec3>> {
        self.positions.clone()
    }

    fn polygons(&self) -> Vec<Vec<u32>> {
        self.polygons.clone()
    }

    fn selected_vertices(&self) -> Vec<u32> {
        self.selected.clone()
    }

    fn vertex_weights(&self, vertex: u32) -> Vec<(String, f32)> {
        self.groups
            .iter()
            .filter_map(|(name, weights)| weights.get(&vertex).map(|w| (name.clone(), *w)))
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

#[derive(Debug, Clone)]
pub struct TestArmature {
    pub transform: Mat4,
    pub bones: Vec<BoneSpec>,
}

impl TestArmature {
    /// `count` deforming bones stacked along +Z, named `Bone.<i>`.
    pub fn chain(count: usize) -> Self {
        let bones = (0..count)
            .map(|i| {
                BoneSpec::new(
                    format!("Bone.{i}"),
                    Vec3::new(0.0, 0.0, i as f32),
                    Vec3::new(0.0, 0.0, i as f32 + 1.0),
                )
            })
            .collect();

        Self {
            transform: Mat4::IDENTITY,
            bones,
        }
    }
}

impl SkinArmature for TestArmature {
    fn world_matrix(&self) -> Mat4 {
        self.transform
    }

    fn bones(&self) -> Vec<BoneSpec> {
        self.bones.clone()
    }
}

/// Exported bone list with the given names.
pub fn bones(names: &[&str]) -> Vec<BoneExport> {
    names
        .iter()
        .map(|name| BoneExport {
            name: (*name).to_string(),
            head: Vec3::ZERO,
            tail: Vec3::Z,
        })
        .collect()
}
