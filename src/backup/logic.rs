// dbvault/src/backup/logic.rs
use uuid::Uuid;

use super::db_dump::dump_database;
use super::s3_upload::upload_dump;
use crate::config::{AppConfig, BackupConfig};
use crate::errors::Result;
use crate::safety::check_key_file;
use crate::storage::RemoteStore;
use crate::utils::process::ToolRunner;
use crate::utils::workspace::RunContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub run_id: Uuid,
    pub artifact_name: String,
    pub remote_id: String,
}

/// Key check → dump/compress/encrypt → upload → cleanup.
///
/// Cleanup runs whether or not the dump or upload succeeded. A failed upload
/// is logged, the local file is still removed, and the upload error is
/// returned once cleanup is done.
pub async fn perform_backup_orchestration(
    app_config: &AppConfig,
    backup_config: &BackupConfig,
    ctx: &RunContext,
    runner: &dyn ToolRunner,
    store: &dyn RemoteStore,
) -> Result<BackupReport> {
    check_key_file(&backup_config.public_key_file, "Public")?;
    ctx.cleanup()?;

    let result = dump_and_upload(app_config, backup_config, ctx, runner, store).await;
    ctx.finish(result)
}

async fn dump_and_upload(
    app_config: &AppConfig,
    backup_config: &BackupConfig,
    ctx: &RunContext,
    runner: &dyn ToolRunner,
    store: &dyn RemoteStore,
) -> Result<BackupReport> {
    dump_database(runner, &app_config.database, ctx, &backup_config.public_key_file)?;

    let uploaded = upload_dump(store, ctx, app_config.time_zone)
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "upload failed; removing local dump anyway");
            eprintln!("Error uploading file: {}", e);
        })?;

    Ok(BackupReport {
        run_id: ctx.run_id,
        artifact_name: uploaded.name,
        remote_id: uploaded.id,
    })
}
