use std::{path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

use crate::options::RunOptionKind;

/// Errors surfaced by a single agent run.
///
/// Lines that fail to decode are never reported here; they are skipped by the
/// decoder and only their stderr text survives, inside [`RunError::Exit`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{provider} does not support option {option}")]
    UnsupportedOption {
        provider: &'static str,
        option: RunOptionKind,
    },
    #[error("{provider} CLI not found (binary={binary:?})")]
    CliNotFound {
        provider: &'static str,
        binary: PathBuf,
    },
    #[error("failed to spawn {provider} process (binary={binary:?}): {source}")]
    Spawn {
        provider: &'static str,
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{provider} stdout unavailable")]
    StdoutUnavailable { provider: &'static str },
    #[error("{provider} stderr unavailable")]
    StderrUnavailable { provider: &'static str },
    #[error("failed to create temporary output file: {0}")]
    TempFile(#[source] std::io::Error),
    #[error("failed to wait for {provider} process: {source}")]
    Wait {
        provider: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{provider} exited with error: {status}{}", stderr_suffix(.stderr))]
    Exit {
        provider: &'static str,
        status: ExitStatus,
        stderr: String,
    },
    #[error("{provider} reported failure: {message}{}", stderr_suffix(.stderr))]
    ProviderFailure {
        provider: &'static str,
        message: String,
        stderr: String,
    },
    #[error("{provider} exceeded timeout of {timeout:?}")]
    Timeout {
        provider: &'static str,
        timeout: Duration,
    },
    #[error("run canceled")]
    Canceled,
}

impl RunError {
    pub fn is_cli_not_found(&self) -> bool {
        matches!(self, RunError::CliNotFound { .. })
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, RunError::Canceled)
    }

    /// Captured stderr diagnostics attached to the error, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            RunError::Exit { stderr, .. } | RunError::ProviderFailure { stderr, .. } => {
                Some(stderr.as_str()).filter(|s| !s.is_empty())
            }
            _ => None,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(", stderr: {trimmed}")
    }
}
