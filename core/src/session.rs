//! Skinning job orchestration
//!
//! [`SkinningSession`] drives one job at a time through
//! capture → export → launch → poll → merge. The host calls
//! [`tick`](SkinningSession::tick) from its own loop; every call returns
//! promptly. All writes to host meshes happen inside `tick`, after the
//! solver has finished.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Result, SkinError};
use crate::export::{self, BoneExport, GeometryExport};
use crate::formats::{write_bone_file, write_mesh_file, WeightFile};
use crate::layout::VertexLayout;
use crate::merge::{merge_weights, resolve_job_meshes, MergeReport};
use crate::protect::ProtectionSnapshot;
use crate::scene::{SkinArmature, SkinMesh};
use crate::settings::SolverSettings;
use crate::supervisor::SolverJob;

/// Default interval between ticks for hosts without their own loop
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for the output stream to close after the solver exits
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// Directory and file names of the interchange files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobWorkspace {
    /// Solver working directory
    pub dir: PathBuf,
    pub mesh_file: String,
    pub bone_file: String,
    pub weight_file: String,
}

impl JobWorkspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            mesh_file: "untitled-mesh.txt".to_string(),
            bone_file: "untitled-bone.txt".to_string(),
            weight_file: "untitled-weight.txt".to_string(),
        }
    }

    pub fn mesh_path(&self) -> PathBuf {
        self.dir.join(&self.mesh_file)
    }

    pub fn bone_path(&self) -> PathBuf {
        self.dir.join(&self.bone_file)
    }

    pub fn weight_path(&self) -> PathBuf {
        self.dir.join(&self.weight_file)
    }

    /// Write the mesh and bone files and remove any stale weight file.
    pub fn write_inputs(&self, geometry: &GeometryExport) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| SkinError::io(&self.dir, e))?;

        write_text_file(&self.mesh_path(), |w| write_mesh_file(w, &geometry.meshes))?;
        write_text_file(&self.bone_path(), |w| write_bone_file(w, &geometry.bones))?;

        let weight_path = self.weight_path();
        match fs::remove_file(&weight_path) {
            Ok(()) => tracing::debug!("Removed stale {}", weight_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SkinError::io(weight_path, e)),
        }

        Ok(())
    }
}

fn write_text_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path).map_err(|e| SkinError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| SkinError::io(path, e))?;
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

/// Result of one tick.
#[derive(Debug)]
pub enum SessionEvent {
    /// No job is running
    Idle,
    /// Job running, nothing new this tick
    Waiting,
    /// One line of solver output
    Progress(String),
    /// Solver finished and its weights were merged
    Completed(JobReport),
}

/// Result of [`SkinningSession::run_to_completion`].
#[derive(Debug)]
pub enum RunOutcome {
    Completed(JobReport),
    Cancelled,
}

/// Summary of a completed job.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Wall time from launch to merge
    pub elapsed: Duration,
    pub merge: MergeReport,
    pub exit_status: Option<ExitStatus>,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs();
        write!(
            f,
            "Complete, running time: {} minutes {} seconds",
            secs / 60,
            secs % 60
        )
    }
}

/// State owned by the running job. Dropped as a unit on completion or cancel.
struct ActiveJob {
    job: SolverJob,
    mesh_names: Vec<String>,
    layout: VertexLayout,
    bones: Vec<BoneExport>,
    protection: Option<ProtectionSnapshot>,
    started: Instant,
    finished_at: Option<Instant>,
}

/// Runs skinning jobs against one solver, one job at a time.
pub struct SkinningSession {
    solver: PathBuf,
    /// Arguments placed before the solver's positional arguments
    solver_prefix: Vec<String>,
    workspace: JobWorkspace,
    settings: SolverSettings,
    active: Option<ActiveJob>,
}

impl SkinningSession {
    pub fn new(solver: impl Into<PathBuf>, workspace: JobWorkspace, settings: SolverSettings) -> Self {
        Self {
            solver: solver.into(),
            solver_prefix: Vec::new(),
            workspace,
            settings,
            active: None,
        }
    }

    /// Run the solver through a wrapper, e.g. an interpreter and its script.
    pub fn with_solver_prefix<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.solver_prefix = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Change settings for the next job.
    pub fn set_settings(&mut self, settings: SolverSettings) {
        self.settings = settings;
    }

    pub fn workspace(&self) -> &JobWorkspace {
        &self.workspace
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Export the meshes and armature and launch the solver.
    ///
    /// On error nothing is left running and no host state was touched.
    pub fn start<M, A>(&mut self, meshes: &[M], armature: &A) -> Result<()>
    where
        M: SkinMesh,
        A: SkinArmature,
    {
        if self.active.is_some() {
            return Err(SkinError::JobActive);
        }
        self.settings.validate()?;

        let sorted: Vec<&M> = export::name_order(meshes)
            .into_iter()
            .map(|i| &meshes[i])
            .collect();

        let protection = self
            .settings
            .protect_selected
            .then(|| ProtectionSnapshot::capture(&sorted));
        let geometry = export::export_geometry(&sorted, armature)?;

        self.workspace.write_inputs(&geometry)?;

        let args = self
            .solver_prefix
            .iter()
            .cloned()
            .chain(self.settings.solver_args(
                &self.workspace.mesh_file,
                &self.workspace.bone_file,
                &self.workspace.weight_file,
            ));
        let job = SolverJob::start(&self.solver, args, &self.workspace.dir)?;

        tracing::info!(
            "Skinning {} meshes ({} vertices) with {} bones",
            geometry.meshes.len(),
            geometry.layout.len(),
            geometry.bones.len()
        );

        self.active = Some(ActiveJob {
            job,
            mesh_names: geometry.meshes.into_iter().map(|m| m.name).collect(),
            layout: geometry.layout,
            bones: geometry.bones,
            protection,
            started: Instant::now(),
            finished_at: None,
        });
        Ok(())
    }

    /// Advance the running job by one step. Never blocks on the solver.
    ///
    /// Surfaces at most one output line per call, including lines still
    /// queued after the solver exited. Once the solver has exited and every
    /// line was surfaced, merges the weight file into `meshes` and releases
    /// the job. A merge failure also releases the job.
    pub fn tick<M: SkinMesh>(&mut self, meshes: &mut [M]) -> Result<SessionEvent> {
        let Some(active) = self.active.as_mut() else {
            return Ok(SessionEvent::Idle);
        };

        // Checked before polling so a line sent just before exit is not skipped
        let finished = active.job.is_finished();
        if let Some(line) = active.job.poll_line() {
            tracing::debug!("solver: {}", line);
            return Ok(SessionEvent::Progress(line));
        }
        if !finished {
            return Ok(SessionEvent::Waiting);
        }

        if !active.job.output_closed() {
            let finished_at = *active.finished_at.get_or_insert_with(Instant::now);
            if finished_at.elapsed() < OUTPUT_GRACE {
                return Ok(SessionEvent::Waiting);
            }
            tracing::warn!("Solver output still open after exit, merging without it");
        }

        let Some(active) = self.active.take() else {
            return Ok(SessionEvent::Idle);
        };
        self.complete(active, meshes).map(SessionEvent::Completed)
    }

    fn complete<M: SkinMesh>(&self, active: ActiveJob, meshes: &mut [M]) -> Result<JobReport> {
        let elapsed = active.started.elapsed();
        let exit_status = active.job.exit_status();

        let weights = WeightFile::load(&self.workspace.weight_path())?;
        let mut job_meshes = resolve_job_meshes(meshes, &active.mesh_names)?;

        let merge = merge_weights(
            &mut job_meshes,
            &active.layout,
            &active.bones,
            &weights,
            active.protection,
        );

        let report = JobReport {
            elapsed,
            merge,
            exit_status,
        };
        tracing::info!(
            "{} ({} weights applied, {} protected, {} dropped)",
            report,
            report.merge.applied,
            report.merge.protected_skips,
            report.merge.warnings.len()
        );
        Ok(report)
    }

    /// Stop the running job without merging. Host weights stay untouched.
    ///
    /// Returns whether a job was running.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(mut active) => {
                active.job.terminate();
                tracing::info!("Skinning cancelled after {:.1?}", active.started.elapsed());
                true
            }
            None => false,
        }
    }

    /// Tick the running job until it completes or `should_cancel` says stop.
    ///
    /// Sleeps `tick_interval` after every tick, so at most one output line is
    /// handled per interval.
    pub fn run_to_completion<M, C, P>(
        &mut self,
        meshes: &mut [M],
        tick_interval: Duration,
        mut should_cancel: C,
        mut on_progress: P,
    ) -> Result<RunOutcome>
    where
        M: SkinMesh,
        C: FnMut() -> bool,
        P: FnMut(&str),
    {
        loop {
            if should_cancel() {
                self.cancel();
                return Ok(RunOutcome::Cancelled);
            }

            match self.tick(meshes)? {
                SessionEvent::Idle => return Ok(RunOutcome::Cancelled),
                SessionEvent::Waiting => {}
                SessionEvent::Progress(line) => on_progress(&line),
                SessionEvent::Completed(report) => return Ok(RunOutcome::Completed(report)),
            }
            thread::sleep(tick_interval);
        }
    }
}

impl Drop for SkinningSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestArmature, TestMesh};

    fn session(dir: &Path, settings: SolverSettings) -> SkinningSession {
        SkinningSession::new("sh", JobWorkspace::new(dir.join("data")), settings)
    }

    #[test]
    fn test_report_display() {
        let report = JobReport {
            elapsed: Duration::from_secs(125),
            merge: MergeReport::default(),
            exit_status: None,
        };
        assert_eq!(
            report.to_string(),
            "Complete, running time: 2 minutes 5 seconds"
        );
    }

    #[test]
    fn test_write_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = JobWorkspace::new(dir.path().join("nested/data"));
        std::fs::create_dir_all(&workspace.dir).unwrap();
        std::fs::write(workspace.weight_path(), "stale").unwrap();

        let a = TestMesh::grid("MeshA", 3);
        let geometry = export::export_geometry(&[&a], &TestArmature::chain(2)).unwrap();
        workspace.write_inputs(&geometry).unwrap();

        let mesh = std::fs::read_to_string(workspace.mesh_path()).unwrap();
        assert!(mesh.lines().any(|l| l == "f,0,1,2"));
        let bones = std::fs::read_to_string(workspace.bone_path()).unwrap();
        assert_eq!(bones.lines().filter(|l| l.starts_with("b,")).count(), 2);
        assert!(!workspace.weight_path().exists());
    }

    #[test]
    fn test_tick_without_job_is_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), SolverSettings::default());
        let mut meshes: Vec<TestMesh> = Vec::new();

        assert!(matches!(session.tick(&mut meshes), Ok(SessionEvent::Idle)));
        assert!(!session.cancel());
    }

    #[test]
    fn test_invalid_settings_rejected_before_export() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SolverSettings {
            resolution: 1000,
            ..Default::default()
        };
        let mut session = session(dir.path(), settings);

        let meshes = vec![TestMesh::grid("MeshA", 3)];
        let err = session.start(&meshes, &TestArmature::chain(1)).unwrap_err();
        assert!(matches!(err, SkinError::InvalidSetting { name: "resolution", .. }));
        assert!(!session.is_active());
        assert!(!session.workspace().mesh_path().exists());
    }

    #[test]
    fn test_unreadable_mesh_launches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), SolverSettings::default());

        let mut broken = TestMesh::grid("MeshA", 3);
        broken.positions = None;
        let err = session.start(&[broken], &TestArmature::chain(1)).unwrap_err();

        assert!(matches!(err, SkinError::UnreadableMesh(_)));
        assert!(!session.is_active());
        assert!(!session.workspace().dir.exists());
    }

    #[test]
    fn test_duplicate_mesh_names_rejected_before_launch() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), SolverSettings::default());

        let meshes = vec![TestMesh::grid("Body", 3), TestMesh::grid("Body", 3)];
        let err = session.start(&meshes, &TestArmature::chain(1)).unwrap_err();

        assert!(matches!(err, SkinError::DuplicateMesh(name) if name == "Body"));
        assert!(!session.is_active());
        assert!(!session.workspace().dir.exists());
    }

    #[test]
    fn test_launch_error_leaves_no_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SkinningSession::new(
            dir.path().join("missing-solver"),
            JobWorkspace::new(dir.path().join("data")),
            SolverSettings::default(),
        );

        let err = session
            .start(&[TestMesh::grid("MeshA", 3)], &TestArmature::chain(1))
            .unwrap_err();
        assert!(matches!(err, SkinError::Supervisor(_)));
        assert!(!session.is_active());
    }

    #[cfg(unix)]
    mod with_solver {
        use super::*;

        /// Write a fake solver script; it is run through `sh`.
        fn fake_solver(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-solver.sh");
            std::fs::write(&path, body).unwrap();
            path
        }

        fn solver_session(dir: &Path, body: &str, settings: SolverSettings) -> SkinningSession {
            let script = fake_solver(dir, body);
            session(dir, settings).with_solver_prefix([script.to_string_lossy().into_owned()])
        }

        fn run(session: &mut SkinningSession, meshes: &mut [TestMesh]) -> (RunOutcome, Vec<String>) {
            let mut progress = Vec::new();
            let outcome = session
                .run_to_completion(meshes, Duration::from_millis(10), || false, |line| {
                    progress.push(line.to_string())
                })
                .unwrap();
            (outcome, progress)
        }

        #[test]
        fn test_full_job() {
            let dir = tempfile::tempdir().unwrap();
            let mut session = solver_session(
                dir.path(),
                "echo \"args: $*\"\necho voxelizing\nprintf 'b,Bone.0\\nw,4,0,0.75\\nw,0,0,1.4\\n' > \"$3\"\n",
                SolverSettings::default(),
            );

            // Host order differs from name order
            let mut meshes = vec![TestMesh::grid("MeshB", 2), TestMesh::grid("MeshA", 3)];
            session.start(&meshes, &TestArmature::chain(1)).unwrap();
            assert!(session.is_active());
            assert!(matches!(
                session.start(&meshes, &TestArmature::chain(1)),
                Err(SkinError::JobActive)
            ));

            let (outcome, progress) = run(&mut session, &mut meshes);
            let RunOutcome::Completed(report) = outcome else {
                panic!("job was cancelled");
            };

            assert_eq!(
                progress,
                vec![
                    "args: untitled-mesh.txt untitled-bone.txt untitled-weight.txt 128 5 64 4 0.2 3",
                    "voxelizing",
                ]
            );

            assert_eq!(meshes[0].weight("Bone.0", 1), Some(0.75));
            assert_eq!(report.merge.applied, 1);
            assert_eq!(report.merge.warnings.len(), 1);
            assert!(!session.is_active());
        }

        #[test]
        fn test_no_output_is_error() {
            let dir = tempfile::tempdir().unwrap();
            let mut session =
                solver_session(dir.path(), "echo crashed\n", SolverSettings::default());

            let mut meshes = vec![TestMesh::grid("MeshA", 3)];
            meshes[0].set_weight("Bone.0", 0, 0.5);
            session.start(&meshes, &TestArmature::chain(1)).unwrap();

            let mut progress = Vec::new();
            let err = session
                .run_to_completion(&mut meshes, Duration::from_millis(10), || false, |l| {
                    progress.push(l.to_string())
                })
                .unwrap_err();

            assert!(matches!(err, SkinError::NoOutput(_)));
            assert_eq!(progress, vec!["crashed"]);
            assert!(!session.is_active());
            assert_eq!(meshes[0].weight("Bone.0", 0), Some(0.5));
        }

        #[test]
        fn test_lines_after_exit_surface_before_merge() {
            let dir = tempfile::tempdir().unwrap();
            let mut session = solver_session(
                dir.path(),
                "echo 'error: mesh is not manifold'
echo 'giving up'
",
                SolverSettings::default(),
            );

            let mut meshes = vec![TestMesh::grid("MeshA", 3)];
            session.start(&meshes, &TestArmature::chain(1)).unwrap();

            // Let the solver exit with both lines still queued
            let deadline = Instant::now() + Duration::from_secs(10);
            while !session.active.as_mut().unwrap().job.is_finished() {
                assert!(Instant::now() < deadline, "solver did not finish");
                thread::sleep(Duration::from_millis(5));
            }

            let mut events = Vec::new();
            let err = loop {
                match session.tick(&mut meshes) {
                    Ok(SessionEvent::Progress(line)) => events.push(line),
                    Ok(SessionEvent::Waiting) => thread::sleep(Duration::from_millis(5)),
                    Ok(other) => panic!("unexpected event {other:?}"),
                    Err(err) => break err,
                }
                assert!(Instant::now() < deadline, "job did not complete");
            };

            assert_eq!(events, vec!["error: mesh is not manifold", "giving up"]);
            assert!(matches!(err, SkinError::NoOutput(_)));
            assert!(!session.is_active());
        }

        #[test]
        fn test_cancel_leaves_weights_untouched() {
            let dir = tempfile::tempdir().unwrap();
            let mut session = solver_session(
                dir.path(),
                "echo started\nprintf 'w,0,0,1.0\\n' > \"$3\"\nexec sleep 30\n",
                SolverSettings::default(),
            );

            let mut meshes = vec![TestMesh::grid("MeshA", 3)];
            meshes[0].set_weight("Bone.0", 0, 0.25);
            meshes[0].set_weight("Other", 2, 0.5);
            let before = meshes[0].groups.clone();

            session.start(&meshes, &TestArmature::chain(1)).unwrap();

            let mut ticks = 0;
            let outcome = session
                .run_to_completion(
                    &mut meshes,
                    Duration::from_millis(10),
                    || {
                        ticks += 1;
                        ticks > 20
                    },
                    |_| {},
                )
                .unwrap();

            assert!(matches!(outcome, RunOutcome::Cancelled));
            assert!(!session.is_active());
            assert_eq!(meshes[0].groups, before);
            assert!(matches!(session.tick(&mut meshes), Ok(SessionEvent::Idle)));
        }

        #[test]
        fn test_protection_through_session() {
            let dir = tempfile::tempdir().unwrap();
            let settings = SolverSettings {
                protect_selected: true,
                ..Default::default()
            };
            let mut session = solver_session(
                dir.path(),
                "printf 'b,Bone.0\\nb,Bone.1\\nw,0,0,1.0\\nw,1,0,1.0\\nw,1,1,0.0\\n' > \"$3\"\n",
                settings,
            );

            let mut mesh = TestMesh::grid("MeshA", 3);
            mesh.selected = vec![1];
            mesh.set_weight("Bone.0", 1, 0.4);
            mesh.set_weight("Bone.1", 1, 0.6);
            mesh.set_weight("Bone.0", 0, 0.1);
            let protected_before = mesh.vertex_weights(1);
            let mut meshes = vec![mesh];

            session.start(&meshes, &TestArmature::chain(2)).unwrap();
            let (outcome, _) = run(&mut session, &mut meshes);

            let RunOutcome::Completed(report) = outcome else {
                panic!("job was cancelled");
            };
            assert_eq!(meshes[0].vertex_weights(1), protected_before);
            assert_eq!(meshes[0].weight("Bone.0", 0), Some(1.0));
            assert_eq!(report.merge.protected_skips, 2);
        }

        #[test]
        fn test_stale_weight_file_not_merged() {
            let dir = tempfile::tempdir().unwrap();
            let mut session = solver_session(dir.path(), "true\n", SolverSettings::default());
            std::fs::create_dir_all(&session.workspace().dir).unwrap();
            std::fs::write(session.workspace().weight_path(), "w,0,0,1.0\n").unwrap();

            let mut meshes = vec![TestMesh::grid("MeshA", 3)];
            session.start(&meshes, &TestArmature::chain(1)).unwrap();

            let err = session
                .run_to_completion(&mut meshes, Duration::from_millis(10), || false, |_| {})
                .unwrap_err();
            assert!(matches!(err, SkinError::NoOutput(_)));
        }
    }
}
