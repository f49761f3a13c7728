// src/exec/terminal.rs

//! External terminal mode: run a command in a forked terminal emulator
//! window instead of the embedded console. Nothing is captured.

use crate::config::ConfigFile;
use crate::exec::backend::LaunchSpec;
use crate::exec::resolve::CommandResolver;

/// Appended to the command when `hold` is on, so the window stays open
/// until the user presses Enter.
pub const HOLD_SUFFIX: &str = "printf '\\n[press enter to close] '; read _";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLauncher {
    program: String,
    args: Vec<String>,
    hold: bool,
}

impl Default for TerminalLauncher {
    fn default() -> Self {
        Self::new("kitty", vec!["-e".to_string()], true)
    }
}

impl TerminalLauncher {
    pub fn new(program: impl Into<String>, args: Vec<String>, hold: bool) -> Self {
        Self {
            program: program.into(),
            args,
            hold,
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(
            cfg.terminal.program.clone(),
            cfg.terminal.args.clone(),
            cfg.terminal.hold,
        )
    }

    /// `<terminal> [terminal args..] <resolved shell argv>`.
    pub fn build(&self, resolver: &CommandResolver, command: &str, elevated: bool) -> LaunchSpec {
        let command = if self.hold {
            format!("{command}; {HOLD_SUFFIX}")
        } else {
            command.to_string()
        };

        let (inner_program, inner_args) = resolver.resolve_argv(&command, elevated);

        let mut args = self.args.clone();
        args.push(inner_program);
        args.extend(inner_args);
        LaunchSpec::detached(self.program.clone(), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_resolved_command() {
        let term = TerminalLauncher::new("alacritty", vec!["-e".into()], false);
        let spec = term.build(&CommandResolver::default(), "yay -Syu", false);
        assert_eq!(spec.argv(), vec!["alacritty", "-e", "sh", "-c", "yay -Syu"]);
        assert!(!spec.capture_output);
    }

    #[test]
    fn hold_keeps_window_open() {
        let spec = TerminalLauncher::default().build(&CommandResolver::default(), "ls", true);
        assert_eq!(spec.program, "kitty");
        assert_eq!(&spec.args[..2], &["-e".to_string(), "pkexec".to_string()]);
        assert_eq!(spec.args.last().unwrap(), &format!("ls; {HOLD_SUFFIX}"));
    }
}
