//! OBJ mesh loading
//!
//! Keeps the file's vertex order and polygons as written; nothing is
//! triangulated or welded, so vertex indices match the source file.

use anyhow::{bail, Context, Result};
use glam::Vec3;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Positions and polygons of an OBJ file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjMesh {
    pub positions: Vec<Vec3>,
    /// Zero-based vertex indices per face
    pub polygons: Vec<Vec<u32>>,
}

/// Load an OBJ file
pub fn load_obj(path: &Path) -> Result<ObjMesh> {
    let file = File::open(path).with_context(|| format!("Failed to open OBJ: {:?}", path))?;
    let mesh = parse_obj(BufReader::new(file))
        .with_context(|| format!("Failed to parse OBJ: {:?}", path))?;

    tracing::debug!(
        "Loaded {:?}: {} vertices, {} polygons",
        path,
        mesh.positions.len(),
        mesh.polygons.len()
    );
    Ok(mesh)
}

/// Parse OBJ `v` and `f` records
pub fn parse_obj<R: BufRead>(reader: R) -> Result<ObjMesh> {
    let mut mesh = ObjMesh::default();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" if parts.len() >= 4 => {
                let mut coords = [0.0f32; 3];
                for (coord, part) in coords.iter_mut().zip(&parts[1..4]) {
                    *coord = part
                        .parse()
                        .with_context(|| format!("line {}: bad coordinate {:?}", number + 1, part))?;
                }
                mesh.positions.push(Vec3::from_array(coords));
            }
            "v" => bail!("line {}: vertex needs three coordinates", number + 1),
            "f" => {
                let polygon = parts[1..]
                    .iter()
                    .map(|v| parse_obj_vertex(v, mesh.positions.len()))
                    .collect::<Option<Vec<u32>>>()
                    .with_context(|| format!("line {}: bad face {:?}", number + 1, line))?;

                if polygon.len() < 3 {
                    bail!("line {}: face needs at least three vertices", number + 1);
                }
                mesh.polygons.push(polygon);
            }
            _ => {}
        }
    }

    if mesh.positions.is_empty() {
        bail!("No vertices found in OBJ file");
    }

    Ok(mesh)
}

/// Vertex index of an OBJ face reference: "v", "v/vt", "v/vt/vn", or "v//vn".
///
/// OBJ indices are 1-based; negative indices count back from the last vertex
/// defined so far.
fn parse_obj_vertex(s: &str, defined: usize) -> Option<u32> {
    let vi: i64 = s.split('/').next()?.parse().ok()?;

    let index = match vi {
        0 => return None,
        i if i > 0 => i - 1,
        i => i64::try_from(defined).ok()? + i,
    };
    u32::try_from(index).ok()
}
