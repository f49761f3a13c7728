// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::io;

use thiserror::Error;

/// A process could not be created.
///
/// Never returned to callers of `CommandDispatcher::run`; it is rendered as a
/// SYSTEM log line instead.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("executable not found: {program}")]
    NotFound { program: String },

    #[error("permission denied: {program}")]
    PermissionDenied { program: String },

    #[error("failed to spawn {program}: {source}")]
    Os {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("empty command line")]
    EmptyCommandLine,
}

impl SpawnError {
    /// Classify an `io::Error` returned by `Command::spawn`.
    pub fn from_io(program: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => SpawnError::NotFound {
                program: program.to_string(),
            },
            io::ErrorKind::PermissionDenied => SpawnError::PermissionDenied {
                program: program.to_string(),
            },
            _ => SpawnError::Os {
                program: program.to_string(),
                source: err,
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Action not found: {0}")]
    ActionNotFound(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

}

pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = SpawnError::from_io("pkexec", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, SpawnError::NotFound { ref program } if program == "pkexec"));
        assert_eq!(err.to_string(), "executable not found: pkexec");
    }

    #[test]
    fn other_io_errors_keep_source() {
        let err = SpawnError::from_io("sh", io::Error::other("fork failed"));
        assert!(matches!(err, SpawnError::Os { .. }));
        assert!(err.to_string().contains("fork failed"));
    }
}
