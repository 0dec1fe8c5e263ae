pub mod process;
pub mod workspace;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use which::which;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use crate::utils::process::CommandSpec;

/// Finds an executable in the system PATH.
pub fn find_executable(program: &str) -> Result<PathBuf> {
    which(program).map_err(|source| AppError::ToolNotFound {
        program: program.to_string(),
        source,
    })
}

/// A PostgreSQL client command (`pg_dump`, `psql`) pointed at the configured server.
///
/// The password, when configured, travels as `PGPASSWORD` and never on the command line.
pub fn pg_client_command(program: &str, db: &DatabaseConfig) -> CommandSpec {
    let command = CommandSpec::new(program).args([
        "-h".to_string(),
        db.host.clone(),
        "-p".to_string(),
        db.port.to_string(),
        "-U".to_string(),
        db.user.clone(),
    ]);
    match &db.password {
        Some(password) => command.env("PGPASSWORD", password.as_str()),
        None => command,
    }
}

/// Removes a file, treating an absent file as already removed.
///
/// Returns `true` when a file was actually deleted.
pub fn silent_remove_file(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed working file");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
