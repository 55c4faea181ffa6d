//! heat-skin core - solver job exchange for surface heat diffuse skinning
//!
//! Exports meshes and a skeleton to plain-text interchange files, runs an
//! external weight solver as a supervised child process, and merges the
//! per-vertex bone weights it produces back into the host's vertex groups.
//!
//! # Architecture
//!
//! - [`SkinMesh`] / [`SkinArmature`] - Traits the host application implements
//! - [`VertexLayout`] - Global vertex index space shared with the solver
//! - [`formats`] - Mesh, bone and weight file formats
//! - [`ProtectionSnapshot`] - Capture/restore of protected vertex weights
//! - [`merge_weights`] - Applies a parsed weight file to the host
//! - [`SolverJob`] - Non-blocking child process supervisor
//! - [`SkinningSession`] - Orchestrates one job at a time, tick by tick

pub mod error;
pub mod export;
pub mod formats;
pub mod layout;
pub mod merge;
pub mod protect;
pub mod scene;
pub mod session;
pub mod settings;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{RecordWarning, Result, SkinError, SupervisorError};
pub use export::{export_geometry, BoneExport, GeometryExport, MeshExport};
pub use formats::weights::{WeightFile, WeightRecord};
pub use layout::{VertexLayout, VertexSlot};
pub use merge::{merge_weights, MergeReport};
pub use protect::ProtectionSnapshot;
pub use scene::{BoneSpec, SkinArmature, SkinMesh};
pub use session::{JobReport, JobWorkspace, RunOutcome, SessionEvent, SkinningSession};
pub use settings::{Sharpness, SolverSettings};
pub use supervisor::{JobState, SolverJob};
