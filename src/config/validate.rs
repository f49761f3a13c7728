// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ConsoleError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ConsoleError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.shell,
            raw.elevation,
            raw.terminal,
            raw.console,
            raw.action,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_programs(cfg)?;
    validate_console(cfg)?;
    validate_actions(cfg)?;
    Ok(())
}

fn validate_programs(cfg: &RawConfigFile) -> Result<()> {
    let programs = [
        ("[shell].program", &cfg.shell.program),
        ("[elevation].program", &cfg.elevation.program),
        ("[terminal].program", &cfg.terminal.program),
    ];

    for (key, value) in programs {
        if value.trim().is_empty() {
            return Err(ConsoleError::ConfigError(format!("{key} must not be empty")));
        }
    }
    Ok(())
}

fn validate_console(cfg: &RawConfigFile) -> Result<()> {
    if cfg.console.event_capacity == 0 {
        return Err(ConsoleError::ConfigError(
            "[console].event_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_actions(cfg: &RawConfigFile) -> Result<()> {
    for (name, action) in cfg.action.iter() {
        if action.cmd.trim().is_empty() {
            return Err(ConsoleError::ConfigError(format!(
                "action '{}' has an empty `cmd`",
                name
            )));
        }
    }
    Ok(())
}
