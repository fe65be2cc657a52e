use std::{env, path::PathBuf};

pub(crate) const CODEX_BINARY_ENV: &str = "CODEX_BINARY";
pub(crate) const RUST_LOG_ENV: &str = "RUST_LOG";
pub(crate) const DEFAULT_RUST_LOG: &str = "error";

/// Quiets the CLI's own logging unless the parent process configured it.
pub(crate) fn default_rust_log_value() -> Option<&'static str> {
    env::var_os(RUST_LOG_ENV)
        .is_none()
        .then_some(DEFAULT_RUST_LOG)
}

pub(crate) fn default_binary_path() -> PathBuf {
    env::var_os(CODEX_BINARY_ENV)
        .filter(|v| !v.to_string_lossy().trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("codex"))
}
