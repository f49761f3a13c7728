// src/lib.rs

pub mod cli;
pub mod config;
pub mod console;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod sink;
pub mod types;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::cli::{CliArgs, CliCommand};
use crate::config::{Action, ConfigFile, default_config_path, load_or_default};
use crate::console::ConsoleRenderer;
use crate::exec::{CommandDispatcher, DispatchSettings, RunRequest};
use crate::sink::{RunOutcome, RunStatus};
use crate::types::{OutputMode, Page};

/// Process exit code used when the command could not be started.
const NO_STATUS_EXIT: i32 = 1;

/// Process exit code used when the run was killed (e.g. Ctrl-C).
const KILLED_EXIT: i32 = 130;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the dispatcher and its log sink
/// - the console renderer (the observer)
/// - Ctrl-C handling (mapped to `kill()`)
///
/// Returns the exit code the binary should exit with.
pub async fn run(args: CliArgs) -> Result<i32> {
    let (config_path, explicit) = match &args.config {
        Some(path) => (PathBuf::from(path), true),
        None => (default_config_path(), false),
    };
    let cfg = load_or_default(&config_path, explicit)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    match args.command {
        CliCommand::List { page } => {
            print_actions(&cfg, page);
            Ok(0)
        }
        CliCommand::Run { ref name } => {
            let action = cfg.action(name)?;
            execute(&cfg, &action, args.dry_run, args.timestamps).await
        }
        CliCommand::Exec {
            elevated,
            terminal,
            ref command,
        } => {
            let output = if terminal {
                OutputMode::Terminal
            } else {
                OutputMode::Console
            };
            let action = Action::adhoc(command.join(" "), elevated, output);
            execute(&cfg, &action, args.dry_run, args.timestamps).await
        }
    }
}

/// Dispatch one action and render its log until it finishes.
async fn execute(cfg: &ConfigFile, action: &Action, dry_run: bool, timestamps: bool) -> Result<i32> {
    let dispatcher = Arc::new(CommandDispatcher::from_config(cfg));

    if dry_run {
        print_dry_run(dispatcher.settings(), action);
        return Ok(0);
    }

    // Subscribe before starting so no line is missed.
    let mut renderer = ConsoleRenderer::attach(Arc::clone(dispatcher.sink()), timestamps);

    // Ctrl-C → kill the running command.
    let ctrl_c = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl-C received; killing command");
            dispatcher.kill();
        })
    };

    info!(action = %action.name, elevated = action.elevated, output = ?action.output, "running action");

    let code = match dispatcher.run_action(action) {
        RunRequest::Accepted => {
            let status = renderer.follow(&mut io::stdout()).await?;
            exit_code_for(status)
        }
        RunRequest::Detached { started } => {
            renderer.flush_pending(&mut io::stdout())?;
            if started { 0 } else { NO_STATUS_EXIT }
        }
        RunRequest::Ignored => {
            ctrl_c.abort();
            bail!("another command is already running");
        }
    };

    ctrl_c.abort();
    debug!(code, "action finished");
    Ok(code)
}

/// Map the final run status to a process exit code.
///
/// - natural exit: the child's own code
/// - terminated by a signal (negative code): `128 + signal`
/// - killed via `kill()`: 130
/// - never started: 1
fn exit_code_for(status: RunStatus) -> i32 {
    match status.outcome {
        Some(RunOutcome::Exited(code)) if code >= 0 => code,
        Some(RunOutcome::Exited(code)) => 128 + code.saturating_neg(),
        Some(RunOutcome::Killed) => KILLED_EXIT,
        Some(RunOutcome::FailedToStart) | None => NO_STATUS_EXIT,
    }
}

fn print_actions(cfg: &ConfigFile, page: Option<Page>) {
    let actions = match page {
        Some(p) => cfg.actions_on(p),
        None => cfg.actions(),
    };

    if actions.is_empty() {
        println!("no actions configured");
        return;
    }

    let mut current: Option<Page> = None;
    for action in actions {
        if current != Some(action.page) {
            println!("{}:", action.page);
            current = Some(action.page);
        }
        let mut flags = Vec::new();
        if action.elevated {
            flags.push("elevated");
        }
        if action.output == OutputMode::Terminal {
            flags.push("terminal");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("  - {} ({}){}", action.name, action.label, flags);
        println!("      cmd: {}", action.cmd);
    }
}

/// Dry-run output: print the argv that would be executed.
fn print_dry_run(settings: &DispatchSettings, action: &Action) {
    let spec = match action.output {
        OutputMode::Console => settings.resolver.resolve(&action.cmd, action.elevated),
        OutputMode::Terminal => settings
            .terminal
            .build(&settings.resolver, &action.cmd, action.elevated),
    };

    println!("console-runner dry-run");
    println!("  action: {}", action.name);
    println!("  output: {:?}", action.output);
    println!("  argv:");
    for arg in spec.argv() {
        println!("    {arg}");
    }

    debug!("dry-run complete (no execution)");
}
