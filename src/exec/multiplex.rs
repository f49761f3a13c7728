// src/exec/multiplex.rs

//! Stream multiplexer: turn the child's stdout/stderr bytes into tagged log
//! lines.
//!
//! Each stream gets its own listener task, so the two are drained
//! concurrently and only intra-stream order is preserved. Decoding is
//! best-effort: malformed UTF-8 becomes U+FFFD and the run goes on.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::exec::backend::OutputStream;
use crate::sink::LogSink;
use crate::types::LineOrigin;

const READ_CHUNK: usize = 8 * 1024;

/// Longest line kept in one piece. Longer runs of bytes without `\n` (e.g.
/// progress bars redrawn with `\r`) are emitted in pieces of this size.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// A decoded line and whether decoding had to substitute bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    pub text: String,
    pub lossy: bool,
}

/// Incremental `\n`-delimited line splitter.
///
/// Bytes are buffered until a terminator arrives, so a line split across
/// several reads comes out whole. A trailing `\r` is stripped. The buffer
/// never holds more than `max_line` bytes; the split points of an overlong
/// line do not depend on how the input was chunked.
#[derive(Debug)]
pub struct LineDecoder {
    pending: Vec<u8>,
    max_line: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line: max_line.max(1),
        }
    }

    /// Feed a chunk and return every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<DecodedLine> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            self.buffer(head, &mut lines);
            lines.push(self.take_line());
            rest = &tail[1..];
        }

        self.buffer(rest, &mut lines);
        lines
    }

    /// Append `bytes` to the pending line, emitting a piece each time it
    /// would grow past `max_line`.
    fn buffer(&mut self, mut bytes: &[u8], lines: &mut Vec<DecodedLine>) {
        while self.pending.len() + bytes.len() > self.max_line {
            let room = self.max_line - self.pending.len();
            let (head, tail) = bytes.split_at(room);
            self.pending.extend_from_slice(head);
            lines.push(self.take_line());
            bytes = tail;
        }
        self.pending.extend_from_slice(bytes);
    }

    fn take_line(&mut self) -> DecodedLine {
        let line = decode(&self.pending);
        self.pending.clear();
        line
    }

    /// Flush an unterminated final fragment, if any.
    pub fn finish(&mut self) -> Option<DecodedLine> {
        if self.pending.is_empty() {
            return None;
        }
        Some(self.take_line())
    }
}

fn decode(bytes: &[u8]) -> DecodedLine {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => DecodedLine {
            text: s.to_string(),
            lossy: false,
        },
        Err(_) => DecodedLine {
            text: String::from_utf8_lossy(bytes).into_owned(),
            lossy: true,
        },
    }
}

/// Per-stream counters returned by a listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub lines: usize,
    pub decode_errors: usize,
}

/// Read `reader` to EOF, forwarding each line to `sink` tagged with `origin`
/// on behalf of run `generation`.
///
/// A read error ends this stream only; whatever was buffered is flushed.
pub async fn pump_lines<R>(
    mut reader: R,
    origin: LineOrigin,
    sink: Arc<LogSink>,
    generation: u64,
) -> PumpStats
where
    R: AsyncRead + Unpin,
{
    let mut decoder = LineDecoder::new();
    let mut stats = PumpStats::default();
    let mut buf = vec![0u8; READ_CHUNK];

    let forward = |line: DecodedLine, stats: &mut PumpStats| {
        if line.lossy {
            stats.decode_errors += 1;
            debug!(%origin, generation, "invalid UTF-8 in output; substituted");
        }
        stats.lines += 1;
        sink.append_for(generation, origin, line.text);
    };

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for line in decoder.push(&buf[..n]) {
                    forward(line, &mut stats);
                }
            }
            Err(e) => {
                warn!(%origin, generation, error = %e, "error reading child output; closing stream");
                break;
            }
        }
    }

    if let Some(line) = decoder.finish() {
        forward(line, &mut stats);
    }

    debug!(
        %origin,
        generation,
        lines = stats.lines,
        decode_errors = stats.decode_errors,
        "output stream closed"
    );
    stats
}

/// The two listener tasks of one run.
#[derive(Debug, Default)]
pub struct Listeners {
    tasks: Vec<JoinHandle<PumpStats>>,
}

impl Listeners {
    /// Spawn one listener per available stream.
    pub fn attach(
        stdout: Option<OutputStream>,
        stderr: Option<OutputStream>,
        sink: &Arc<LogSink>,
        generation: u64,
    ) -> Self {
        let mut tasks = Vec::with_capacity(2);
        for (stream, origin) in [(stdout, LineOrigin::Stdout), (stderr, LineOrigin::Stderr)] {
            if let Some(stream) = stream {
                let sink = Arc::clone(sink);
                tasks.push(tokio::spawn(pump_lines(stream, origin, sink, generation)));
            }
        }
        Self { tasks }
    }

    /// Wait for both streams to reach EOF, giving up after `grace`.
    ///
    /// Listeners still running after the grace period (a grandchild holding
    /// the pipe open) are aborted.
    pub async fn drain(self, grace: Duration) -> PumpStats {
        let mut total = PumpStats::default();
        let deadline = tokio::time::Instant::now() + grace;

        for mut task in self.tasks {
            match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(Ok(stats)) => {
                    total.lines += stats.lines;
                    total.decode_errors += stats.decode_errors;
                }
                Ok(Err(e)) => warn!(error = %e, "output listener task failed"),
                Err(_) => {
                    warn!(?grace, "output still open after process exit; detaching listener");
                    task.abort();
                }
            }
        }
        total
    }
}
