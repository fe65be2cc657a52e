use std::{collections::BTreeMap, io, path::Path, time::Duration};

use tokio::process::{Child, Command};

use crate::RunError;

/// Spawns `command`, retrying briefly while the binary is still being written
/// (`ETXTBSY`). A missing binary maps to [`RunError::CliNotFound`].
pub(crate) fn spawn_with_retry(
    command: &mut Command,
    binary: &Path,
    provider: &'static str,
) -> Result<Child, RunError> {
    let mut backoff = Duration::from_millis(2);
    let mut attempt = 0;
    loop {
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(source) => {
                let is_busy = matches!(source.kind(), io::ErrorKind::ExecutableFileBusy)
                    || source.raw_os_error() == Some(26);
                if is_busy && attempt < 4 {
                    attempt += 1;
                    std::thread::sleep(backoff);
                    backoff = std::cmp::min(backoff * 2, Duration::from_millis(50));
                    continue;
                }
                // A missing working directory also surfaces as NotFound.
                let missing_dir = command
                    .as_std()
                    .get_current_dir()
                    .is_some_and(|dir| !dir.is_dir());
                if source.kind() == io::ErrorKind::NotFound && !missing_dir {
                    return Err(RunError::CliNotFound {
                        provider,
                        binary: binary.to_path_buf(),
                    });
                }
                return Err(RunError::Spawn {
                    provider,
                    binary: binary.to_path_buf(),
                    source,
                });
            }
        }
    }
}

/// Applies caller-supplied environment overrides to a command.
pub fn apply_env(command: &mut Command, env: &BTreeMap<String, String>) {
    for (key, value) in env {
        command.env(key, value);
    }
}
