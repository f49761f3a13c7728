// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running shell commands, using
//! `tokio::process::Command`, and streaming their output into the
//! [`LogSink`](crate::sink::LogSink).
//!
//! - [`dispatcher`] is the public entry point (`run` / `kill`) and enforces
//!   the one-run-at-a-time rule.
//! - [`resolve`] turns a command string into a shell (or elevated shell)
//!   argv.
//! - [`runner`] spawns and supervises the real OS process.
//! - [`multiplex`] drains stdout/stderr into tagged lines.
//! - [`terminal`] forks commands into an external terminal emulator.
//! - [`backend`] provides the `Launcher` trait and the production
//!   `ProcessLauncher`, which tests can replace with a scripted one.

pub mod backend;
pub mod dispatcher;
pub mod multiplex;
pub mod resolve;
pub mod runner;
pub mod terminal;

pub use backend::{KillSwitch, LaunchSpec, Launcher, OutputStream, ProcessLauncher, RunHandle};
pub use dispatcher::{CommandDispatcher, DispatchSettings, KILLED_LINE, RunRequest};
pub use resolve::CommandResolver;
pub use terminal::TerminalLauncher;
