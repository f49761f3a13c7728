// src/sink/mod.rs

//! The log sink: ordered, append-only console log plus run status.
//!
//! The sink is the single source of truth observed by the presentation
//! layer. Three writers race on it during a run (the stdout listener, the
//! stderr listener and the dispatcher), so every mutation goes through one
//! mutex and sequence numbers are assigned under that lock.
//!
//! Observers can either:
//! - poll with [`LogSink::snapshot`] / [`LogSink::lines_after`], or
//! - subscribe to [`SinkEvent`]s via a bounded broadcast channel, and watch
//!   the [`RunStatus`] for spinners or for awaiting completion.
//!
//! A lagging broadcast subscriber loses events, never lines: it can always
//! resync from `snapshot()`.

pub mod line;

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tracing::trace;

use crate::types::LineOrigin;

pub use line::LogLine;

/// Default capacity of the observer broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own with this code.
    Exited(i32),
    /// `kill()` ended the run; the OS exit status is not reported.
    Killed,
    /// The process could not be spawned.
    FailedToStart,
}

/// Run lifecycle as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStatus {
    pub running: bool,
    /// Set once when a run ends; `None` while running and before the first run.
    pub outcome: Option<RunOutcome>,
    /// Ordinal of the current (or last) run; 0 before the first run.
    pub generation: u64,
}

impl RunStatus {
    /// The exit code of a naturally completed run.
    pub fn exit_code(&self) -> Option<i32> {
        match self.outcome {
            Some(RunOutcome::Exited(code)) => Some(code),
            _ => None,
        }
    }
}

/// Change notifications pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Appended(LogLine),
    Cleared,
    VisibilityChanged(bool),
    StatusChanged(RunStatus),
}

#[derive(Debug, Default)]
struct SinkState {
    lines: Vec<LogLine>,
    next_seq: u64,
    visible: bool,
    status: RunStatus,
}

#[derive(Debug)]
pub struct LogSink {
    state: Mutex<SinkState>,
    events: broadcast::Sender<SinkEvent>,
    status_tx: watch::Sender<RunStatus>,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl LogSink {
    /// Create an empty, hidden sink whose observer channel holds at most
    /// `event_capacity` undelivered events.
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        let (status_tx, _) = watch::channel(RunStatus::default());
        Self {
            state: Mutex::new(SinkState::default()),
            events,
            status_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SinkEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn push_locked(&self, state: &mut SinkState, origin: LineOrigin, text: String) -> LogLine {
        let line = LogLine {
            seq: state.next_seq,
            at: Utc::now(),
            origin,
            text,
        };
        state.next_seq += 1;
        state.lines.push(line.clone());
        trace!(seq = line.seq, origin = %origin, "log line appended");
        self.emit(SinkEvent::Appended(line.clone()));
        line
    }

    fn set_status_locked(&self, state: &mut SinkState, status: RunStatus) {
        state.status = status;
        self.status_tx.send_replace(status);
        self.emit(SinkEvent::StatusChanged(status));
    }

    /// Append a line to the current buffer.
    pub fn append(&self, origin: LineOrigin, text: impl Into<String>) -> LogLine {
        let mut state = self.lock();
        self.push_locked(&mut state, origin, text.into())
    }

    /// Append a line on behalf of run `generation`.
    ///
    /// Returns `None` (and drops the line) if a newer run has started since.
    pub fn append_for(
        &self,
        generation: u64,
        origin: LineOrigin,
        text: impl Into<String>,
    ) -> Option<LogLine> {
        let mut state = self.lock();
        if state.status.generation != generation {
            trace!(
                generation,
                current = state.status.generation,
                "dropping line from a previous run"
            );
            return None;
        }
        Some(self.push_locked(&mut state, origin, text.into()))
    }

    /// Discard every buffered line. Sequence numbers keep counting.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.lines.clear();
        self.emit(SinkEvent::Cleared);
    }

    pub fn set_visible(&self, visible: bool) {
        let mut state = self.lock();
        if state.visible != visible {
            state.visible = visible;
            self.emit(SinkEvent::VisibilityChanged(visible));
        }
    }

    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    /// Begin a new run: clear the buffer, bump the generation and mark the
    /// sink as running, atomically. Returns the new generation.
    pub fn start_run(&self) -> u64 {
        let mut state = self.lock();
        state.lines.clear();
        self.emit(SinkEvent::Cleared);

        let status = RunStatus {
            running: true,
            outcome: None,
            generation: state.status.generation + 1,
        };
        self.set_status_locked(&mut state, status);
        status.generation
    }

    /// Append the terminal SYSTEM line of run `generation` and mark it idle,
    /// atomically. Returns `false` if that run is no longer current or
    /// already finished.
    pub fn finish_run(
        &self,
        generation: u64,
        outcome: RunOutcome,
        system_line: impl Into<String>,
    ) -> bool {
        let mut state = self.lock();
        if state.status.generation != generation || !state.status.running {
            return false;
        }
        self.push_locked(&mut state, LineOrigin::System, system_line.into());
        let status = RunStatus {
            running: false,
            outcome: Some(outcome),
            generation,
        };
        self.set_status_locked(&mut state, status);
        true
    }

    pub fn status(&self) -> RunStatus {
        self.lock().status
    }

    pub fn is_running(&self) -> bool {
        self.lock().status.running
    }

    /// Watch the run status (e.g. to drive a spinner or await completion).
    pub fn watch_status(&self) -> watch::Receiver<RunStatus> {
        self.status_tx.subscribe()
    }

    /// Subscribe to change notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SinkEvent> {
        self.events.subscribe()
    }

    /// Consistent copy of the whole buffer.
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.lock().lines.clone()
    }

    /// Lines with `seq > after`, in order.
    pub fn lines_after(&self, after: u64) -> Vec<LogLine> {
        let state = self.lock();
        let start = state.lines.partition_point(|l| l.seq <= after);
        state.lines[start..].to_vec()
    }

    pub fn last(&self) -> Option<LogLine> {
        self.lock().lines.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().lines.is_empty()
    }
}
