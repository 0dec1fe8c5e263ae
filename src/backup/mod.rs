mod logic;
pub(crate) mod db_dump;
pub(crate) mod s3_upload;

use anyhow::Result;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::storage::S3Store;
use crate::utils::process::SystemRunner;
use crate::utils::workspace::RunContext;

pub use logic::{BackupReport, perform_backup_orchestration};

/// Public entry point for the backup process.
pub async fn run_backup_flow(app_config: &AppConfig) -> Result<BackupReport> {
    let backup_config = match &app_config.operation {
        Some(crate::config::OperationConfig::Backup(cfg)) => cfg,
        _ => anyhow::bail!("Backup operation selected but no backup configuration found."),
    };

    let ctx = RunContext::new(&app_config.work_dir);
    let span = tracing::info_span!("backup", run_id = %ctx.run_id);
    async {
        let store = S3Store::connect(&app_config.spaces_config).await;
        let report =
            perform_backup_orchestration(app_config, backup_config, &ctx, &SystemRunner, &store)
                .await?;
        tracing::info!(
            artifact = %report.artifact_name,
            id = %report.remote_id,
            "backup stored"
        );
        Ok::<_, anyhow::Error>(report)
    }
    .instrument(span)
    .await
}
