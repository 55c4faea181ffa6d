//! Weight merge
//!
//! Applies a parsed weight file to the host meshes:
//!
//! 1. Every group in the group list is recreated empty on every job mesh.
//! 2. Records are applied in file order with replace semantics, skipping
//!    protected vertices and records that do not resolve.
//! 3. Protected weights are restored.

use crate::error::{RecordWarning, Result, SkinError};
use crate::export::BoneExport;
use crate::formats::WeightFile;
use crate::layout::VertexLayout;
use crate::protect::ProtectionSnapshot;
use crate::scene::SkinMesh;

/// Outcome of a merge.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// Group names that were recreated, in bone list order
    pub groups: Vec<String>,
    /// Records written to the host
    pub applied: usize,
    /// Records skipped because the vertex is protected
    pub protected_skips: usize,
    /// Protected weights written back after the records
    pub restored: usize,
    /// Records dropped while parsing or resolving
    pub warnings: Vec<RecordWarning>,
}

/// Pick the job meshes out of the host's meshes, in export order.
///
/// Matches by name. Fails before anything is mutated if one is missing.
pub fn resolve_job_meshes<'a, M: SkinMesh>(
    meshes: &'a mut [M],
    names: &[String],
) -> Result<Vec<&'a mut M>> {
    let mut slots: Vec<Option<&'a mut M>> = names.iter().map(|_| None).collect();

    for mesh in meshes.iter_mut() {
        let Some(index) = names.iter().position(|name| name == mesh.name()) else {
            continue;
        };
        if slots[index].is_none() {
            slots[index] = Some(mesh);
        }
    }

    slots
        .into_iter()
        .zip(names)
        .map(|(slot, name)| slot.ok_or_else(|| SkinError::MeshMissing(name.clone())))
        .collect()
}

/// Group list used to resolve bone positions.
///
/// Declarations in the weight file win; otherwise the exported bone order.
fn group_list(bones: &[BoneExport], weights: &WeightFile) -> Vec<String> {
    if !weights.declares_groups() {
        return bones.iter().map(|b| b.name.clone()).collect();
    }

    for (position, declared) in weights.groups.iter().enumerate() {
        match bones.get(position) {
            Some(bone) if bone.name == *declared => {}
            Some(bone) => tracing::debug!(
                "Weight file declares '{}' at position {}, exported bone was '{}'",
                declared,
                position,
                bone.name
            ),
            None => tracing::debug!(
                "Weight file declares extra group '{}' at position {}",
                declared,
                position
            ),
        }
    }
    weights.groups.clone()
}

/// Apply a weight file to the job meshes.
///
/// `meshes` must be in export order (see [`resolve_job_meshes`]).
pub fn merge_weights<M: SkinMesh>(
    meshes: &mut [&mut M],
    layout: &VertexLayout,
    bones: &[BoneExport],
    weights: &WeightFile,
    protection: Option<ProtectionSnapshot>,
) -> MergeReport {
    debug_assert_eq!(meshes.len(), layout.mesh_count());

    let groups = group_list(bones, weights);
    for mesh in meshes.iter_mut() {
        for group in &groups {
            mesh.replace_group(group);
        }
    }

    let mut report = MergeReport {
        warnings: weights.warnings.clone(),
        ..Default::default()
    };

    for record in &weights.records {
        let Some(slot) = layout.resolve(record.vertex) else {
            report.warnings.push(RecordWarning::UnknownVertex {
                line: record.line,
                vertex: record.vertex,
                vertex_count: layout.len(),
            });
            continue;
        };
        let Some(group) = groups.get(record.bone) else {
            report.warnings.push(RecordWarning::UnknownBone {
                line: record.line,
                position: record.bone,
                group_count: groups.len(),
            });
            continue;
        };

        if protection
            .as_ref()
            .is_some_and(|p| p.is_protected(slot.mesh, slot.local))
        {
            report.protected_skips += 1;
            continue;
        }

        let Some(mesh) = meshes.get_mut(slot.mesh) else {
            continue;
        };
        mesh.set_weight(group, slot.local, record.weight);
        report.applied += 1;
    }

    if let Some(protection) = protection {
        report.restored = protection.restore(meshes);
    }

    for warning in &report.warnings {
        tracing::warn!("Dropped weight record: {}", warning);
    }

    report.groups = groups;
    report
}
