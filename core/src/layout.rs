//! Global vertex index space
//!
//! The solver sees all exported meshes as one vertex list. [`VertexLayout`]
//! maps between that global index and `(mesh, local index)`.

/// One entry of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexSlot {
    /// Index in the concatenated vertex list
    pub global: u32,
    /// Index within the owning mesh
    pub local: u32,
    /// Position of the owning mesh in export order
    pub mesh: usize,
}

/// Concatenation of mesh vertex lists in export order.
///
/// Invariant: `slots[i].global == i`.
#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    slots: Vec<VertexSlot>,
    /// First global index of each mesh
    offsets: Vec<u32>,
    counts: Vec<u32>,
}

impl VertexLayout {
    /// Build a layout from per-mesh vertex counts, in export order.
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut layout = Self::default();
        for (mesh, count) in counts.into_iter().enumerate() {
            let offset = layout.slots.len() as u32;
            layout.offsets.push(offset);
            layout.counts.push(count as u32);
            layout
                .slots
                .extend((0..count as u32).map(|local| VertexSlot {
                    global: offset + local,
                    local,
                    mesh,
                }));
        }
        layout
    }

    /// Total vertex count over all meshes
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn mesh_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn slots(&self) -> &[VertexSlot] {
        &self.slots
    }

    /// Global index of a mesh's first vertex
    pub fn mesh_offset(&self, mesh: usize) -> Option<u32> {
        self.offsets.get(mesh).copied()
    }

    pub fn mesh_vertex_count(&self, mesh: usize) -> Option<u32> {
        self.counts.get(mesh).copied()
    }

    /// Map a global index back to its mesh and local index.
    pub fn resolve(&self, global: u32) -> Option<VertexSlot> {
        self.slots.get(global as usize).copied()
    }

    /// Map a mesh-local index to the global index.
    pub fn global_index(&self, mesh: usize, local: u32) -> Option<u32> {
        let count = self.mesh_vertex_count(mesh)?;
        if local >= count {
            return None;
        }
        Some(self.offsets[mesh] + local)
    }
}
