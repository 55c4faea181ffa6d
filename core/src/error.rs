//! Error types for skinning jobs

use std::io;
use std::path::PathBuf;

/// Errors that abort a skinning job.
///
/// Every variant is raised before the host's vertex groups are touched, so a
/// failed job leaves the host exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum SkinError {
    /// No meshes were passed to the job
    #[error("no meshes selected for skinning")]
    EmptySelection,

    /// Two meshes in the job share a name, so weights could not be routed back
    #[error("more than one mesh is named '{0}'")]
    DuplicateMesh(String),

    /// A mesh could not provide its vertex positions
    #[error("mesh '{0}' has no readable vertex positions")]
    UnreadableMesh(String),

    /// A polygon references a vertex the mesh does not have
    #[error("mesh '{mesh}' polygon {polygon} references vertex {vertex} (mesh has {vertex_count})")]
    InvalidPolygon {
        mesh: String,
        polygon: usize,
        vertex: u32,
        vertex_count: usize,
    },

    /// The armature has no bones flagged for deformation
    #[error("armature has no deforming bones")]
    NoDeformBones,

    /// A bone name cannot be written to the comma separated bone file
    #[error("bone name {0:?} contains a comma or line break")]
    InvalidBoneName(String),

    /// A solver setting is outside its accepted range
    #[error("invalid setting {name} = {value} (must be {range})")]
    InvalidSetting {
        name: &'static str,
        value: String,
        range: &'static str,
    },

    /// A job is already running on this session
    #[error("a skinning job is already running")]
    JobActive,

    /// A mesh exported at job start was not handed back for the merge
    #[error("mesh '{0}' from the running job is missing")]
    MeshMissing(String),

    /// The solver exited without writing a weight file
    #[error("solver produced no output: {}", .0.display())]
    NoOutput(PathBuf),

    /// Filesystem error on one of the interchange files
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The solver process could not be started
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

impl SkinError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by the solver process supervisor.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// Spawning the child failed (missing binary, permissions, bad directory)
    #[error("failed to launch solver {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The child's stdout was not captured
    #[error("solver stdout is not piped")]
    MissingStdout,

    /// The background reader thread could not be spawned
    #[error("failed to spawn solver output reader: {0}")]
    Reader(#[source] io::Error),
}

/// Per-record problems found while reading a weight file.
///
/// These never abort a job: the offending record is dropped and the warning
/// is reported alongside the merge result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordWarning {
    /// Wrong field count or unparsable number
    #[error("line {line}: malformed record: {reason}")]
    Malformed { line: usize, reason: String },

    /// Weight outside [0, 1] (or NaN)
    #[error("line {line}: weight {weight} outside [0, 1]")]
    WeightOutOfRange { line: usize, weight: f32 },

    /// Global vertex index outside the exported layout
    #[error("line {line}: vertex {vertex} not in exported layout ({vertex_count} vertices)")]
    UnknownVertex {
        line: usize,
        vertex: u32,
        vertex_count: usize,
    },

    /// Bone position with no declared or exported group
    #[error("line {line}: bone position {position} has no group ({group_count} groups)")]
    UnknownBone {
        line: usize,
        position: usize,
        group_count: usize,
    },
}

/// Result type for skinning operations.
pub type Result<T, E = SkinError> = std::result::Result<T, E>;
