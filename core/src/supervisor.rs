//! Solver process supervisor
//!
//! Runs the solver as a child process and exposes its lifecycle without ever
//! blocking the caller. A background thread moves stdout lines into an
//! unbounded channel; the owner polls that channel and the process status
//! from its own loop.
//!
//! ```text
//! Running ──(process exits)──▶ Finished
//!    └─────(terminate)───────▶ Terminated
//! ```

use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::error::SupervisorError;

/// Lifecycle of a solver process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    /// Exited on its own
    Finished,
    /// Killed through [`SolverJob::terminate`]
    Terminated,
}

/// A running (or ended) solver process and its output stream.
#[derive(Debug)]
pub struct SolverJob {
    child: Child,
    /// `None` once the stream is closed or the job was terminated
    lines: Option<Receiver<String>>,
    reader: Option<JoinHandle<()>>,
    state: JobState,
    exit_status: Option<ExitStatus>,
}

impl SolverJob {
    /// Spawn `program` in `working_dir` and start pumping its stdout.
    pub fn start<I, S>(program: &Path, args: I, working_dir: &Path) -> Result<Self, SupervisorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SupervisorError::Launch {
                program: program.to_path_buf(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            kill_and_reap(&mut child);
            return Err(SupervisorError::MissingStdout);
        };

        let (tx, rx) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("solver-stdout".to_string())
            .spawn(move || pump_lines(stdout, tx));
        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(SupervisorError::Reader(e));
            }
        };

        tracing::info!("Started solver {} (pid {})", program.display(), child.id());

        Ok(Self {
            child,
            lines: Some(rx),
            reader: Some(reader),
            state: JobState::Running,
            exit_status: None,
        })
    }

    /// Next output line, if one has arrived. Never blocks.
    ///
    /// Lines remain available after the process finishes until the stream is
    /// drained. After [`terminate`](Self::terminate) this always returns `None`.
    pub fn poll_line(&mut self) -> Option<String> {
        let rx = self.lines.as_ref()?;
        match rx.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                // Reader hit end of stream and everything was delivered
                self.lines = None;
                if let Some(reader) = self.reader.take() {
                    let _ = reader.join();
                }
                None
            }
        }
    }

    /// Whether the process has ended. Never blocks.
    pub fn is_finished(&mut self) -> bool {
        if self.state != JobState::Running {
            return true;
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!("Solver exited with {}", status);
                self.exit_status = Some(status);
                self.state = JobState::Finished;
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Error checking solver status: {}", e);
                self.state = JobState::Finished;
                true
            }
        }
    }

    /// Kill the process and discard any unread output.
    ///
    /// Does nothing once the job has finished or was already terminated.
    pub fn terminate(&mut self) {
        if self.state != JobState::Running {
            return;
        }

        if let Err(e) = self.child.kill() {
            tracing::debug!("Solver kill failed (already exited?): {}", e);
        }
        match self.child.wait() {
            Ok(status) => self.exit_status = Some(status),
            Err(e) => tracing::warn!("Failed to reap solver: {}", e),
        }

        // The reader exits on its next failed send or at end of stream
        self.lines = None;
        self.reader = None;
        self.state = JobState::Terminated;
        tracing::info!("Solver terminated");
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Exit status once the process has been reaped
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Whether every output line has been delivered (or discarded)
    pub fn output_closed(&self) -> bool {
        self.lines.is_none()
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for SolverJob {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Reader thread body: stdout lines into the channel until EOF or hang-up.
fn pump_lines(stdout: ChildStdout, tx: Sender<String>) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(decode_line(&buf)).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("Solver output stream failed: {}", e);
                break;
            }
        }
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
