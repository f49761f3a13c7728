#![allow(dead_code)]

use console_runner::config::{ActionConfig, ConfigFile, RawConfigFile};
use console_runner::types::{OutputMode, Page};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_shell(mut self, program: &str) -> Self {
        self.config.shell.program = program.to_string();
        self
    }

    pub fn with_elevation(mut self, program: &str, args: &[&str]) -> Self {
        self.config.elevation.program = program.to_string();
        self.config.elevation.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_terminal(mut self, program: &str, args: &[&str], hold: bool) -> Self {
        self.config.terminal.program = program.to_string();
        self.config.terminal.args = args.iter().map(|a| a.to_string()).collect();
        self.config.terminal.hold = hold;
        self
    }

    pub fn with_drain_grace_ms(mut self, ms: u64) -> Self {
        self.config.console.drain_grace_ms = ms;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.config.console.event_capacity = capacity;
        self
    }

    pub fn with_action(mut self, name: &str, action: ActionConfig) -> Self {
        self.config.action.insert(name.to_string(), action);
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ActionConfig`.
pub struct ActionConfigBuilder {
    action: ActionConfig,
}

impl ActionConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            action: ActionConfig {
                cmd: cmd.to_string(),
                label: None,
                page: Page::default(),
                elevated: false,
                output: OutputMode::Console,
            },
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.action.label = Some(label.to_string());
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.action.page = page;
        self
    }

    pub fn elevated(mut self, val: bool) -> Self {
        self.action.elevated = val;
        self
    }

    pub fn in_terminal(mut self) -> Self {
        self.action.output = OutputMode::Terminal;
        self
    }

    pub fn build(self) -> ActionConfig {
        self.action
    }
}
