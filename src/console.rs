// src/console.rs

//! Text renderer for the console log: the observer side of the sink.
//!
//! The renderer subscribes to [`SinkEvent`]s when it is attached, so it must
//! be attached *before* a run starts to see every line. If the broadcast
//! channel overflows, it catches up from the sink's buffer by sequence
//! number, so no line is printed twice or skipped. The run status is watched
//! alongside the events, so a dropped `StatusChanged` event cannot leave the
//! renderer waiting after the run has ended.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::sink::{LogLine, LogSink, RunStatus, SinkEvent};

pub struct ConsoleRenderer {
    sink: Arc<LogSink>,
    events: broadcast::Receiver<SinkEvent>,
    status: watch::Receiver<RunStatus>,
    last_seq: Option<u64>,
    timestamps: bool,
}

impl ConsoleRenderer {
    pub fn attach(sink: Arc<LogSink>, timestamps: bool) -> Self {
        let events = sink.subscribe();
        let status = sink.watch_status();
        Self {
            sink,
            events,
            status,
            last_seq: None,
            timestamps,
        }
    }

    pub fn render(&self, line: &LogLine) -> String {
        if self.timestamps {
            line.timestamped()
        } else {
            line.to_string()
        }
    }

    fn print<W: Write>(&mut self, line: &LogLine, out: &mut W) -> Result<()> {
        if self.last_seq.is_some_and(|last| line.seq <= last) {
            return Ok(());
        }
        writeln!(out, "{}", self.render(line)).context("writing console output")?;
        self.last_seq = Some(line.seq);
        Ok(())
    }

    fn catch_up<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let missed = match self.last_seq {
            Some(last) => self.sink.lines_after(last),
            None => self.sink.snapshot(),
        };
        for line in &missed {
            self.print(line, out)?;
        }
        Ok(())
    }

    fn handle<W: Write>(&mut self, event: SinkEvent, out: &mut W) -> Result<Option<RunStatus>> {
        match event {
            SinkEvent::Appended(line) => self.print(&line, out)?,
            SinkEvent::StatusChanged(status) if !status.running => {
                self.catch_up(out)?;
                out.flush().context("flushing console output")?;
                return Ok(Some(status));
            }
            SinkEvent::StatusChanged(_) | SinkEvent::Cleared | SinkEvent::VisibilityChanged(_) => {}
        }
        Ok(None)
    }

    /// Print lines as they arrive until a run finishes; return its status.
    pub async fn follow<W: Write>(&mut self, out: &mut W) -> Result<RunStatus> {
        loop {
            tokio::select! {
                biased;

                event = self.events.recv() => match event {
                    Ok(event) => {
                        if let Some(status) = self.handle(event, out)? {
                            return Ok(status);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "console renderer lagged; catching up from buffer");
                        self.catch_up(out)?;
                    }
                    Err(RecvError::Closed) => return self.finish(out),
                },

                changed = self.status.changed() => {
                    let running = self.status.borrow_and_update().running;
                    if changed.is_err() || !running {
                        debug!("run ended without a status event; finishing from buffer");
                        return self.finish(out);
                    }
                }
            }
        }
    }

    fn finish<W: Write>(&mut self, out: &mut W) -> Result<RunStatus> {
        self.catch_up(out)?;
        out.flush().context("flushing console output")?;
        Ok(self.sink.status())
    }

    /// Print whatever is already pending without waiting.
    pub fn flush_pending<W: Write>(&mut self, out: &mut W) -> Result<()> {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle(event, out)?;
                }
                Err(TryRecvError::Lagged(_)) => self.catch_up(out)?,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        out.flush().context("flushing console output")?;
        Ok(())
    }
}
