// src/exec/backend.rs

//! Pluggable process launcher abstraction.
//!
//! The dispatcher talks to a `Launcher` instead of `tokio::process` directly.
//! This makes it easy to swap in a scripted launcher in tests while keeping
//! the production implementation in [`runner`](super::runner).
//!
//! - `ProcessLauncher` is the default implementation used by `console-runner`.
//!   It spawns a real OS process and supervises it until exit or kill.
//! - Tests can provide their own `Launcher` that, for example, records which
//!   command lines were started and replays canned output.

use std::fmt;

use tokio::io::AsyncRead;
use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::SpawnError;

use super::runner::spawn_process;

/// A readable child output stream.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Fully resolved command line for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    /// If false, stdout and stderr go to `/dev/null` and the handle carries
    /// no output streams (used for detached terminal windows).
    pub capture_output: bool,
}

impl LaunchSpec {
    pub fn captured(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            capture_output: true,
        }
    }

    pub fn detached(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            capture_output: false,
        }
    }

    /// Full argv, program first.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg:?}")?;
        }
        Ok(())
    }
}

/// One-shot request to terminate a running process.
#[derive(Debug)]
pub struct KillSwitch {
    tx: Option<oneshot::Sender<()>>,
}

impl KillSwitch {
    pub fn new(tx: oneshot::Sender<()>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Request termination. Best-effort: returns `false` if the process had
    /// already been reaped (the supervisor is gone).
    pub fn kill(mut self) -> bool {
        match self.tx.take() {
            Some(tx) => {
                let delivered = tx.send(()).is_ok();
                if !delivered {
                    debug!("kill requested after process already exited");
                }
                delivered
            }
            None => false,
        }
    }
}

/// Handle to a started process.
///
/// The three channels are independently consumable: the two output streams
/// can be moved into listener tasks while the exit receiver is awaited
/// elsewhere. The exit receiver yields the process exit code, or a synthetic
/// negative code if the process was killed.
pub struct RunHandle {
    pub pid: Option<u32>,
    pub stdout: Option<OutputStream>,
    pub stderr: Option<OutputStream>,
    pub exit: oneshot::Receiver<i32>,
    pub kill: KillSwitch,
}

impl fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunHandle")
            .field("pid", &self.pid)
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .finish_non_exhaustive()
    }
}

/// Trait abstracting how processes are started.
///
/// Production code uses [`ProcessLauncher`]; tests can provide their own
/// implementation that doesn't spawn real processes. Implementations are
/// called from within a Tokio runtime and may spawn tasks.
pub trait Launcher: Send + Sync + 'static {
    fn start(&self, spec: &LaunchSpec) -> Result<RunHandle, SpawnError>;
}

/// Real launcher used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn start(&self, spec: &LaunchSpec) -> Result<RunHandle, SpawnError> {
        spawn_process(spec)
    }
}
