// src/exec/resolve.rs

//! Turn an opaque shell command into an argv.
//!
//! The command text may contain pipes, `&&`, expansions and so on, so it is
//! always handed to a shell as a single `-c` argument and never parsed here.

use crate::config::ConfigFile;
use crate::exec::backend::LaunchSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResolver {
    shell: String,
    elevation_program: String,
    elevation_args: Vec<String>,
}

impl Default for CommandResolver {
    fn default() -> Self {
        Self::new("sh", "pkexec", Vec::new())
    }
}

impl CommandResolver {
    pub fn new(
        shell: impl Into<String>,
        elevation_program: impl Into<String>,
        elevation_args: Vec<String>,
    ) -> Self {
        Self {
            shell: shell.into(),
            elevation_program: elevation_program.into(),
            elevation_args,
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(
            cfg.shell.program.clone(),
            cfg.elevation.program.clone(),
            cfg.elevation.args.clone(),
        )
    }

    /// `<shell> -c <command>`, or
    /// `<agent> [agent args..] <shell> -c <command>` when `elevated`.
    pub fn resolve(&self, command: &str, elevated: bool) -> LaunchSpec {
        let (program, args) = self.resolve_argv(command, elevated);
        LaunchSpec::captured(program, args)
    }

    /// Same as [`resolve`](Self::resolve) but as a plain program/args pair.
    pub fn resolve_argv(&self, command: &str, elevated: bool) -> (String, Vec<String>) {
        let shell_args = ["-c".to_string(), command.to_string()];

        if elevated {
            let mut args = self.elevation_args.clone();
            args.push(self.shell.clone());
            args.extend(shell_args);
            (self.elevation_program.clone(), args)
        } else {
            (self.shell.clone(), shell_args.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_command_goes_through_shell() {
        let spec = CommandResolver::default().resolve("echo a | tr a b && echo $HOME", false);
        assert_eq!(
            spec.argv(),
            vec!["sh", "-c", "echo a | tr a b && echo $HOME"]
        );
        assert!(spec.capture_output);
    }

    #[test]
    fn elevated_command_wraps_shell_in_agent() {
        let resolver = CommandResolver::new("bash", "pkexec", vec!["--disable-internal-agent".into()]);
        let spec = resolver.resolve("pacman -Sc", true);
        assert_eq!(
            spec.argv(),
            vec!["pkexec", "--disable-internal-agent", "bash", "-c", "pacman -Sc"]
        );
    }
}
