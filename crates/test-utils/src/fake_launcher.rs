use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use console_runner::errors::SpawnError;

use crate::StartedSpecs;
use console_runner::exec::{KillSwitch, LaunchSpec, Launcher, OutputStream, RunHandle};
use tokio::sync::{Notify, oneshot};

/// Exit code a scripted process reports when killed (mirrors SIGKILL).
pub const SCRIPTED_KILL_CODE: i32 = -9;

/// How a scripted process ends.
#[derive(Debug, Clone)]
pub enum ScriptedExit {
    /// Exit immediately with this code.
    Code(i32),
    /// Never exit on its own; only a kill ends it.
    UntilKilled,
    /// Exit with the code once the gate is notified (or earlier if killed).
    OnNotify(Arc<Notify>, i32),
}

/// Canned behaviour for one `start` call.
#[derive(Debug, Clone)]
pub struct Script {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit: ScriptedExit,
    pub fail_spawn: bool,
}

impl Script {
    pub fn exits(code: i32) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit: ScriptedExit::Code(code),
            fail_spawn: false,
        }
    }

    pub fn until_killed() -> Self {
        Self {
            exit: ScriptedExit::UntilKilled,
            ..Self::exits(0)
        }
    }

    pub fn on_notify(gate: Arc<Notify>, code: i32) -> Self {
        Self {
            exit: ScriptedExit::OnNotify(gate, code),
            ..Self::exits(0)
        }
    }

    pub fn spawn_failure() -> Self {
        Self {
            fail_spawn: true,
            ..Self::exits(0)
        }
    }

    pub fn stdout(mut self, bytes: &[u8]) -> Self {
        self.stdout = bytes.to_vec();
        self
    }

    pub fn stderr(mut self, bytes: &[u8]) -> Self {
        self.stderr = bytes.to_vec();
        self
    }
}

/// A fake launcher that:
/// - records every `LaunchSpec` it was asked to start
/// - replays queued scripts in order (then `Script::exits(0)`).
pub struct ScriptedLauncher {
    started: StartedSpecs,
    scripts: Mutex<VecDeque<Script>>,
}

impl ScriptedLauncher {
    pub fn new(started: StartedSpecs) -> Self {
        Self {
            started,
            scripts: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_script(self, script: Script) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }
}

impl Launcher for ScriptedLauncher {
    fn start(&self, spec: &LaunchSpec) -> Result<RunHandle, SpawnError> {
        self.started.lock().unwrap().push(spec.clone());

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::exits(0));

        if script.fail_spawn {
            return Err(SpawnError::NotFound {
                program: spec.program.clone(),
            });
        }

        let Script {
            stdout,
            stderr,
            exit,
            ..
        } = script;

        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
        let (exit_tx, exit_rx) = oneshot::channel::<i32>();

        tokio::spawn(async move {
            let code = match exit {
                ScriptedExit::Code(code) => code,
                ScriptedExit::UntilKilled => match kill_rx.await {
                    Ok(()) => SCRIPTED_KILL_CODE,
                    Err(_) => std::future::pending::<i32>().await,
                },
                ScriptedExit::OnNotify(gate, code) => {
                    tokio::select! {
                        _ = gate.notified() => code,
                        Ok(()) = &mut kill_rx => SCRIPTED_KILL_CODE,
                    }
                }
            };
            let _ = exit_tx.send(code);
        });

        let (stdout, stderr) = if spec.capture_output {
            (
                Some(Box::new(Cursor::new(stdout)) as OutputStream),
                Some(Box::new(Cursor::new(stderr)) as OutputStream),
            )
        } else {
            (None, None)
        };

        Ok(RunHandle {
            pid: None,
            stdout,
            stderr,
            exit: exit_rx,
            kill: KillSwitch::new(kill_tx),
        })
    }
}
