// src/types.rs

use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;

/// Classification of a log line.
///
/// - `Command`: echo of the command text that started the run.
/// - `Stdout` / `Stderr`: a line read from the child's output streams.
/// - `System`: status generated by the dispatcher itself (exit code, kill
///   notice, spawn failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineOrigin {
    Command,
    Stdout,
    Stderr,
    System,
}

impl LineOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineOrigin::Command => "COMMAND",
            LineOrigin::Stdout => "STDOUT",
            LineOrigin::Stderr => "STDERR",
            LineOrigin::System => "SYSTEM",
        }
    }
}

impl fmt::Display for LineOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the output of an action goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Captured into the log sink and shown in the embedded console.
    #[default]
    Console,
    /// Forked into an external terminal emulator; nothing is captured.
    Terminal,
}

/// Screen of the shell an action button lives on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Welcome,
    #[default]
    Dashboard,
    Logistics,
    Visuals,
    Maintenance,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Page::Welcome => "welcome",
            Page::Dashboard => "dashboard",
            Page::Logistics => "logistics",
            Page::Visuals => "visuals",
            Page::Maintenance => "maintenance",
        };
        f.write_str(s)
    }
}
