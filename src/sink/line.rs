// src/sink/line.rs

use std::fmt;

use chrono::{DateTime, Utc};

use crate::types::LineOrigin;

/// One immutable entry of the console log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Insertion order; strictly increasing for the lifetime of a sink.
    pub seq: u64,
    /// Wall-clock time the line was appended.
    pub at: DateTime<Utc>,
    pub origin: LineOrigin,
    /// Raw line content without the line terminator.
    pub text: String,
}

impl LogLine {
    /// Render as `HH:MM:SS [ORIGIN] text`.
    pub fn timestamped(&self) -> String {
        format!("{} {}", self.at.format("%H:%M:%S"), self)
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.origin, self.text)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn display_uses_origin_tag() {
        let line = LogLine {
            seq: 0,
            at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            origin: LineOrigin::Stdout,
            text: "hi".to_string(),
        };
        assert_eq!(line.to_string(), "[STDOUT] hi");
        assert_eq!(line.timestamped(), "03:04:05 [STDOUT] hi");
    }
}
