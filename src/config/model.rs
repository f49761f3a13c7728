// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::{ConsoleError, Result};
use crate::types::{OutputMode, Page};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [shell]
/// program = "bash"
///
/// [elevation]
/// program = "pkexec"
///
/// [action.clean_cache]
/// label = "Clean package cache"
/// page = "maintenance"
/// cmd = "paccache -rk1"
/// elevated = true
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub shell: ShellSection,

    #[serde(default)]
    pub elevation: ElevationSection,

    #[serde(default)]
    pub terminal: TerminalSection,

    #[serde(default)]
    pub console: ConsoleSection,

    /// All actions from `[action.<name>]`, keyed by action name.
    #[serde(default)]
    pub action: BTreeMap<String, ActionConfig>,
}

/// `[shell]` section: the interpreter every command goes through.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellSection {
    /// Invoked as `<program> -c <command>`.
    #[serde(default = "default_shell_program")]
    pub program: String,
}

fn default_shell_program() -> String {
    "sh".to_string()
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            program: default_shell_program(),
        }
    }
}

/// `[elevation]` section: privilege-escalation front-end.
#[derive(Debug, Clone, Deserialize)]
pub struct ElevationSection {
    #[serde(default = "default_elevation_program")]
    pub program: String,

    /// Extra agent arguments, placed before the shell.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_elevation_program() -> String {
    "pkexec".to_string()
}

impl Default for ElevationSection {
    fn default() -> Self {
        Self {
            program: default_elevation_program(),
            args: Vec::new(),
        }
    }
}

/// `[terminal]` section: emulator used for `output = "terminal"` actions.
#[derive(Debug, Clone, Deserialize)]
pub struct TerminalSection {
    #[serde(default = "default_terminal_program")]
    pub program: String,

    /// Arguments placed before the shell invocation (e.g. `-e`).
    #[serde(default = "default_terminal_args")]
    pub args: Vec<String>,

    /// Keep the window open after the command ends.
    #[serde(default = "default_hold")]
    pub hold: bool,
}

fn default_terminal_program() -> String {
    "kitty".to_string()
}

fn default_terminal_args() -> Vec<String> {
    vec!["-e".to_string()]
}

fn default_hold() -> bool {
    true
}

impl Default for TerminalSection {
    fn default() -> Self {
        Self {
            program: default_terminal_program(),
            args: default_terminal_args(),
            hold: default_hold(),
        }
    }
}

/// `[console]` section: embedded console tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleSection {
    /// Capacity of the observer broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// How long to wait for stdout/stderr to close after the process exits.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,
}

fn default_event_capacity() -> usize {
    crate::sink::DEFAULT_EVENT_CAPACITY
}

fn default_drain_grace_ms() -> u64 {
    500
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            drain_grace_ms: default_drain_grace_ms(),
        }
    }
}

/// `[action.<name>]` section: one button of the shell.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    /// Shell command text; never parsed, always run via `<shell> -c`.
    pub cmd: String,

    /// Button caption; defaults to the action name.
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub page: Page,

    /// Run through the elevation agent.
    #[serde(default)]
    pub elevated: bool,

    #[serde(default)]
    pub output: OutputMode,
}

/// Validated configuration. Construct via `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub shell: ShellSection,
    pub elevation: ElevationSection,
    pub terminal: TerminalSection,
    pub console: ConsoleSection,
    action: BTreeMap<String, ActionConfig>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.shell, raw.elevation, raw.terminal, raw.console, raw.action)
    }
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        shell: ShellSection,
        elevation: ElevationSection,
        terminal: TerminalSection,
        console: ConsoleSection,
        action: BTreeMap<String, ActionConfig>,
    ) -> Self {
        Self {
            shell,
            elevation,
            terminal,
            console,
            action,
        }
    }

    /// Look up an action by name.
    pub fn action(&self, name: &str) -> Result<Action> {
        self.action
            .get(name)
            .map(|cfg| Action::new(name, cfg))
            .ok_or_else(|| ConsoleError::ActionNotFound(name.to_string()))
    }

    /// All actions, ordered by page and then name.
    pub fn actions(&self) -> Vec<Action> {
        let mut actions: Vec<Action> = self
            .action
            .iter()
            .map(|(name, cfg)| Action::new(name, cfg))
            .collect();
        actions.sort_by(|a, b| a.page.cmp(&b.page).then_with(|| a.name.cmp(&b.name)));
        actions
    }

    /// Actions on one page, ordered by name.
    pub fn actions_on(&self, page: Page) -> Vec<Action> {
        self.actions().into_iter().filter(|a| a.page == page).collect()
    }

    pub fn action_count(&self) -> usize {
        self.action.len()
    }
}

/// A resolved action, ready to hand to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub label: String,
    pub page: Page,
    pub cmd: String,
    pub elevated: bool,
    pub output: OutputMode,
}

impl Action {
    fn new(name: &str, cfg: &ActionConfig) -> Self {
        Self {
            name: name.to_string(),
            label: cfg.label.clone().unwrap_or_else(|| name.to_string()),
            page: cfg.page,
            cmd: cfg.cmd.clone(),
            elevated: cfg.elevated,
            output: cfg.output,
        }
    }

    /// An unnamed one-off action for a command typed on the CLI.
    pub fn adhoc(cmd: impl Into<String>, elevated: bool, output: OutputMode) -> Self {
        let cmd = cmd.into();
        Self {
            name: "exec".to_string(),
            label: cmd.clone(),
            page: Page::default(),
            cmd,
            elevated,
            output,
        }
    }
}
