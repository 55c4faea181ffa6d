//! Mesh file writer
//!
//! ```text
//! v,<x>,<y>,<z>
//! f,<i0>,<i1>,...
//! ```
//!
//! Each mesh writes its vertex lines followed by its polygon lines. Polygon
//! indices are global: the local index plus the vertex count of every mesh
//! written before it.

use std::io::{self, Write};

use super::MESH_HEADER;
use crate::export::MeshExport;

/// Write meshes in the given order.
pub fn write_mesh_file<W: Write>(w: &mut W, meshes: &[MeshExport]) -> io::Result<()> {
    writeln!(w, "{}", MESH_HEADER)?;

    let mut vertex_offset = 0u32;
    for mesh in meshes {
        for p in &mesh.positions {
            writeln!(w, "v,{:.6},{:.6},{:.6}", p.x, p.y, p.z)?;
        }

        for polygon in &mesh.polygons {
            w.write_all(b"f")?;
            for &index in polygon {
                write!(w, ",{}", vertex_offset + index)?;
            }
            w.write_all(b"\n")?;
        }

        vertex_offset += mesh.positions.len() as u32;
    }

    Ok(())
}
