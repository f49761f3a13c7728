// src/exec/dispatcher.rs

//! Command dispatcher: the public entry point for running commands.
//!
//! At most one command runs at a time. A run goes through
//! `IDLE -> STARTING -> RUNNING -> COMPLETED -> IDLE`:
//!
//! - STARTING: the sink is cleared, marked running and visible, and the
//!   command text is echoed as a COMMAND line.
//! - RUNNING: stdout/stderr listeners drain into the sink while a supervisor
//!   task awaits the exit code.
//! - COMPLETED: either the supervisor appends `EXIT CODE: <n>` after both
//!   streams closed, or `kill()` appended `KILLED`. Whichever takes the
//!   active run out of `active` first writes the only terminal line.
//!
//! A spawn failure at STARTING appends `FAILED TO START: ..` and goes back
//! to IDLE without ever running.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::{Action, ConfigFile};
use crate::exec::backend::{KillSwitch, Launcher, ProcessLauncher, RunHandle};
use crate::exec::multiplex::Listeners;
use crate::exec::resolve::CommandResolver;
use crate::exec::runner::UNKNOWN_EXIT_CODE;
use crate::exec::terminal::TerminalLauncher;
use crate::sink::{LogSink, RunOutcome, RunStatus};
use crate::types::{LineOrigin, OutputMode};

/// Terminal line appended by [`CommandDispatcher::kill`].
pub const KILLED_LINE: &str = "KILLED";

/// Default post-exit wait for the output listeners.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// What happened to a run request. Never an error: failures are reported
/// through the log only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRequest {
    /// The request entered the run lifecycle. A spawn failure still counts
    /// as accepted; it is visible in the log.
    Accepted,
    /// Another command was running; nothing changed.
    Ignored,
    /// Forked into an external terminal; no output is captured. `started`
    /// is false if the terminal could not be spawned.
    Detached { started: bool },
}

/// Static knobs for a dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub resolver: CommandResolver,
    pub terminal: TerminalLauncher,
    pub drain_grace: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            resolver: CommandResolver::default(),
            terminal: TerminalLauncher::default(),
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }
}

impl DispatchSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            resolver: CommandResolver::from_config(cfg),
            terminal: TerminalLauncher::from_config(cfg),
            drain_grace: Duration::from_millis(cfg.console.drain_grace_ms),
        }
    }
}

/// The one running command.
struct ActiveRun {
    generation: u64,
    kill: KillSwitch,
}

type ActiveSlot = Arc<Mutex<Option<ActiveRun>>>;

fn lock_active(active: &Mutex<Option<ActiveRun>>) -> MutexGuard<'_, Option<ActiveRun>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct CommandDispatcher<L: Launcher = ProcessLauncher> {
    launcher: Arc<L>,
    sink: Arc<LogSink>,
    settings: DispatchSettings,
    active: ActiveSlot,
}

impl<L: Launcher> fmt::Debug for CommandDispatcher<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("settings", &self.settings)
            .field("status", &self.sink.status())
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher<ProcessLauncher> {
    /// Production dispatcher with a fresh sink, configured from `cfg`.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let sink = Arc::new(LogSink::new(cfg.console.event_capacity));
        Self::new(ProcessLauncher, sink, DispatchSettings::from_config(cfg))
    }
}

impl<L: Launcher> CommandDispatcher<L> {
    pub fn new(launcher: L, sink: Arc<LogSink>, settings: DispatchSettings) -> Self {
        Self {
            launcher: Arc::new(launcher),
            sink,
            settings,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// The sink this dispatcher writes to; hand it to observers.
    pub fn sink(&self) -> &Arc<LogSink> {
        &self.sink
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        lock_active(&self.active).is_some()
    }

    pub fn status(&self) -> RunStatus {
        self.sink.status()
    }

    /// Run `command` through the shell, elevated if asked.
    ///
    /// If a command is already running this is a no-op and returns
    /// [`RunRequest::Ignored`]. Must be called from within a Tokio runtime.
    pub fn run(&self, command: &str, elevated: bool) -> RunRequest {
        let mut active = lock_active(&self.active);
        if let Some(current) = active.as_ref() {
            debug!(
                command,
                running = current.generation,
                "a command is already running; ignoring request"
            );
            return RunRequest::Ignored;
        }

        let generation = self.sink.start_run();
        self.sink.set_visible(true);
        self.sink.append(LineOrigin::Command, command);

        let spec = self.settings.resolver.resolve(command, elevated);
        info!(generation, elevated, %spec, "starting command");

        match self.launcher.start(&spec) {
            Ok(handle) => {
                let RunHandle {
                    pid,
                    stdout,
                    stderr,
                    exit,
                    kill,
                } = handle;
                debug!(generation, ?pid, "command spawned");

                *active = Some(ActiveRun { generation, kill });

                let listeners = Listeners::attach(stdout, stderr, &self.sink, generation);
                tokio::spawn(supervise_run(
                    Arc::clone(&self.active),
                    Arc::clone(&self.sink),
                    generation,
                    exit,
                    listeners,
                    self.settings.drain_grace,
                ));
            }
            Err(err) => {
                warn!(generation, error = %err, "failed to start command");
                self.sink.finish_run(
                    generation,
                    RunOutcome::FailedToStart,
                    format!("FAILED TO START: {err}"),
                );
            }
        }

        RunRequest::Accepted
    }

    /// Kill the running command, if any.
    ///
    /// The KILLED line is appended and the run marked idle immediately; the
    /// OS is not waited on, so a few buffered lines from the dying process
    /// may still land after the notice.
    pub fn kill(&self) -> bool {
        let mut active = lock_active(&self.active);
        let Some(run) = active.take() else {
            debug!("kill requested but nothing is running");
            return false;
        };

        let delivered = run.kill.kill();
        info!(generation = run.generation, delivered, "killing running command");
        self.sink.finish_run(run.generation, RunOutcome::Killed, KILLED_LINE);
        true
    }

    /// Dispatch a catalogue action according to its output mode.
    pub fn run_action(&self, action: &Action) -> RunRequest {
        debug!(action = %action.name, output = ?action.output, "dispatching action");
        match action.output {
            OutputMode::Console => self.run(&action.cmd, action.elevated),
            OutputMode::Terminal => self.open_in_terminal(&action.cmd, action.elevated),
        }
    }

    /// Fork `command` into an external terminal window.
    ///
    /// Does not touch the run state; the outcome is noted as a SYSTEM line.
    pub fn open_in_terminal(&self, command: &str, elevated: bool) -> RunRequest {
        let spec = self.settings.terminal.build(&self.settings.resolver, command, elevated);
        info!(elevated, %spec, "opening command in external terminal");

        let started = match self.launcher.start(&spec) {
            Ok(handle) => {
                self.sink
                    .append(LineOrigin::System, format!("OPENED IN TERMINAL: {command}"));
                let program = spec.program.clone();
                tokio::spawn(async move {
                    let _kill = handle.kill;
                    match handle.exit.await {
                        Ok(code) => debug!(program = %program, code, "terminal window closed"),
                        Err(_) => debug!(program = %program, "terminal supervisor went away"),
                    }
                });
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to open terminal");
                self.sink
                    .append(LineOrigin::System, format!("FAILED TO START: {err}"));
                false
            }
        };

        RunRequest::Detached { started }
    }

    /// Wait until no command is running and return the final status.
    pub async fn wait_idle(&self) -> RunStatus {
        let mut rx = self.sink.watch_status();
        loop {
            let status = *rx.borrow_and_update();
            if !status.running {
                return status;
            }
            if rx.changed().await.is_err() {
                return self.sink.status();
            }
        }
    }
}

/// Await the exit of run `generation`, let its listeners drain, then report
/// the exit code unless the run was killed in the meantime.
async fn supervise_run(
    active: ActiveSlot,
    sink: Arc<LogSink>,
    generation: u64,
    exit: oneshot::Receiver<i32>,
    listeners: Listeners,
    drain_grace: Duration,
) {
    let code = match exit.await {
        Ok(code) => code,
        Err(_) => {
            warn!(generation, "process supervisor dropped without an exit code");
            UNKNOWN_EXIT_CODE
        }
    };

    let stats = listeners.drain(drain_grace).await;

    let mut guard = lock_active(&active);
    let still_current = guard
        .as_ref()
        .is_some_and(|run| run.generation == generation);

    if still_current {
        guard.take();
        sink.finish_run(generation, RunOutcome::Exited(code), format!("EXIT CODE: {code}"));
        info!(
            generation,
            exit_code = code,
            lines = stats.lines,
            decode_errors = stats.decode_errors,
            "command finished"
        );
    } else {
        debug!(generation, exit_code = code, "run was killed; exit not reported");
    }
}
