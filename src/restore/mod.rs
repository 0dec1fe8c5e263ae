mod logic;
pub(crate) mod db_restore;
pub(crate) mod s3_download;
pub(crate) mod schema_reset;

use anyhow::{Context, Result};
use tracing::Instrument;

use crate::config::{AppConfig, RestoreConfig};
use crate::storage::S3Store;
use crate::utils::process::SystemRunner;
use crate::utils::workspace::RunContext;
use schema_reset::PgSchemaConnector;

pub use logic::{
    RestoreDeps, RestoreOutcome, check_restore_preconditions, perform_restore_orchestration,
};

/// Public entry point for the restore process.
pub async fn run_restore_flow(app_config: &AppConfig) -> Result<RestoreOutcome> {
    let restore_config = match &app_config.operation {
        Some(crate::config::OperationConfig::Restore(cfg)) => cfg,
        _ => anyhow::bail!("Restore operation selected but no restore configuration found."),
    };

    let hostname = hostname::get()
        .context("Failed to read the local host name")?
        .to_string_lossy()
        .into_owned();

    restore_on_host(app_config, restore_config, &hostname).await
}

async fn restore_on_host(
    app_config: &AppConfig,
    restore_config: &RestoreConfig,
    hostname: &str,
) -> Result<RestoreOutcome> {
    let ctx = RunContext::new(&app_config.work_dir);
    let span = tracing::info_span!("restore", run_id = %ctx.run_id, host = %hostname);
    async {
        check_restore_preconditions(restore_config, hostname)?;

        let store = S3Store::connect(&app_config.spaces_config).await;
        let connector = PgSchemaConnector::new(&app_config.database);
        let deps = RestoreDeps {
            runner: &SystemRunner,
            store: &store,
            connector: &connector,
        };
        let outcome = perform_restore_orchestration(app_config, restore_config, &ctx, &deps).await?;
        if let RestoreOutcome::Restored {
            artifact,
            tables_dropped,
        } = &outcome
        {
            tracing::info!(artifact = %artifact.name, tables_dropped, "restore finished");
        }
        Ok::<_, anyhow::Error>(outcome)
    }
    .instrument(span)
    .await
}
