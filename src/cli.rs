// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::Page;

/// Command-line arguments for `console-runner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "console-runner",
    version,
    about = "Run the distro shell's predefined actions and stream their output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `ConsoleRunner.toml` in the current working directory; if that
    /// file does not exist, built-in defaults are used.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONSOLE_RUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Prefix every console line with its time of arrival.
    #[arg(long, global = true)]
    pub timestamps: bool,

    /// Print the resolved command line, but don't execute anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// List configured actions, grouped by page.
    List {
        /// Only show actions on this page.
        #[arg(long, value_enum)]
        page: Option<Page>,
    },

    /// Run a configured action by name.
    Run {
        /// Action name, as in `[action.<name>]`.
        name: String,
    },

    /// Run an ad-hoc shell command.
    Exec {
        /// Run through the privilege-escalation agent.
        #[arg(long)]
        elevated: bool,

        /// Open in an external terminal instead of the console.
        #[arg(long)]
        terminal: bool,

        /// The command text; passed to the shell as-is.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
