//! Error types for relay-core

use thiserror::Error;

/// Errors from driving the codex CLI as a subprocess
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Codex CLI binary not found. Is the Codex CLI installed?")]
    NotInstalled,

    #[error("Failed to spawn codex process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O failure while driving codex: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_not_installed_displays_correctly() {
        let error = CliError::NotInstalled;
        assert!(error.to_string().contains("Codex CLI binary not found"));
    }

    #[test]
    fn cli_error_spawn_failed_displays_correctly() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let error = CliError::Spawn(io_error);
        assert!(error.to_string().contains("Failed to spawn codex process"));
    }

    #[test]
    fn cli_error_converts_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let error: CliError = io_error.into();
        assert!(matches!(error, CliError::Io(_)));
    }
}
