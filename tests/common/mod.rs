#![allow(dead_code)]

use std::time::Duration;

use console_runner::sink::LogSink;
use console_runner::types::LineOrigin;

pub use console_runner_test_utils::{StartedSpecs, builders, fake_launcher, init_tracing, with_timeout};

/// Render the sink as `[ORIGIN] text` strings.
pub fn rendered(sink: &LogSink) -> Vec<String> {
    sink.snapshot().iter().map(|l| l.to_string()).collect()
}

/// Texts of the lines with the given origin, in order.
pub fn texts_of(sink: &LogSink, origin: LineOrigin) -> Vec<String> {
    sink.snapshot()
        .into_iter()
        .filter(|l| l.origin == origin)
        .map(|l| l.text)
        .collect()
}

/// Poll until some line satisfies `pred`, or panic after ~2 seconds.
pub async fn wait_for_line<F>(sink: &LogSink, pred: F)
where
    F: Fn(&str) -> bool,
{
    for _ in 0..200 {
        if sink.snapshot().iter().any(|l| pred(&l.to_string())) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected line never appeared; log = {:?}", rendered(sink));
}
