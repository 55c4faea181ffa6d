//! Plain-text interchange formats shared with the solver
//!
//! All three files are line oriented and comma separated. The first field of
//! each line is a tag (`v`, `f`, `b`, `w`); lines starting with `#` are
//! comments.

pub mod bone;
pub mod mesh;
pub mod weights;

pub use bone::write_bone_file;
pub use mesh::write_mesh_file;
pub use weights::{WeightFile, WeightRecord};

/// Header comment of the mesh file
pub const MESH_HEADER: &str = "# surface heat diffuse mesh export.";

/// Header comment of the bone file
pub const BONE_HEADER: &str = "# surface heat diffuse bone export.";

/// Field separator
pub const SEPARATOR: char = ',';

/// Comment prefix
pub const COMMENT: char = '#';
