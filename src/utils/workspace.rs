// dbvault/src/utils/workspace.rs
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::Result;
use crate::utils::silent_remove_file;

pub const ENCRYPTED_DUMP_FILENAME: &str = "backup_db.sql.gz.enc";
pub const COMPRESSED_DUMP_FILENAME: &str = "db.sql.gz";
pub const PLAIN_DUMP_FILENAME: &str = "db.sql";

/// Per-run state threaded through every pipeline step: a run id for log
/// correlation and the fixed working-file paths each stage reads or writes.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub encrypted_dump: PathBuf,
    pub compressed_dump: PathBuf,
    pub plain_dump: PathBuf,
}

impl RunContext {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            encrypted_dump: work_dir.join(ENCRYPTED_DUMP_FILENAME),
            compressed_dump: work_dir.join(COMPRESSED_DUMP_FILENAME),
            plain_dump: work_dir.join(PLAIN_DUMP_FILENAME),
        }
    }

    pub fn working_files(&self) -> [&Path; 3] {
        [
            self.encrypted_dump.as_path(),
            self.compressed_dump.as_path(),
            self.plain_dump.as_path(),
        ]
    }

    /// Removes every working file. Safe to call any number of times.
    ///
    /// All files are attempted even if one removal fails; the first error is returned.
    pub fn cleanup(&self) -> Result<usize> {
        let mut removed = 0;
        let mut first_error = None;
        for path in self.working_files() {
            match silent_remove_file(path) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to remove working file"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Cleans up after a run and passes `result` through.
    ///
    /// A step failure wins over a cleanup failure; the latter is then only logged.
    pub fn finish<T>(&self, result: Result<T>) -> Result<T> {
        let cleanup = self.cleanup();
        match (result, cleanup) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                tracing::warn!(error = %cleanup_err, "cleanup after failed run also failed");
                Err(e)
            }
        }
    }
}
