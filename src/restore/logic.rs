// dbvault/src/restore/logic.rs
use super::db_restore::{decompress_dump, decrypt_dump, load_dump};
use super::s3_download::{download_artifact, select_latest_artifact};
use super::schema_reset::{SchemaConnector, clear_schema};
use crate::config::{AppConfig, RestoreConfig};
use crate::errors::Result;
use crate::safety::{check_key_file, check_restore_target};
use crate::storage::{RemoteObject, RemoteStore};
use crate::utils::process::ToolRunner;
use crate::utils::workspace::RunContext;

/// Collaborators the restore run talks to.
pub struct RestoreDeps<'a> {
    pub runner: &'a dyn ToolRunner,
    pub store: &'a dyn RemoteStore,
    pub connector: &'a dyn SchemaConnector,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored {
        artifact: RemoteObject,
        tables_dropped: usize,
    },
    /// The remote container holds no artifacts.
    NothingToRestore,
}

/// Host guard, then key guard. Both must pass before any client is built, so
/// nothing at all happens on a host that is not a restore target.
pub fn check_restore_preconditions(restore_config: &RestoreConfig, hostname: &str) -> Result<()> {
    check_restore_target(hostname)?;
    check_key_file(&restore_config.private_key_file, "Private")
}

/// Select → download → decrypt → decompress → clear schema → load → cleanup.
///
/// Callers run [`check_restore_preconditions`] first. Working files are
/// removed on every exit path.
pub async fn perform_restore_orchestration(
    app_config: &AppConfig,
    restore_config: &RestoreConfig,
    ctx: &RunContext,
    deps: &RestoreDeps<'_>,
) -> Result<RestoreOutcome> {
    ctx.cleanup()?;

    let result = restore_latest(app_config, restore_config, ctx, deps).await;
    ctx.finish(result)
}

async fn restore_latest(
    app_config: &AppConfig,
    restore_config: &RestoreConfig,
    ctx: &RunContext,
    deps: &RestoreDeps<'_>,
) -> Result<RestoreOutcome> {
    // Scoped to this function: dropped (and so disconnected) on any early return.
    let mut schema = deps.connector.connect().await?;

    let Some(artifact) = select_latest_artifact(deps.store).await? else {
        schema.close().await?;
        return Ok(RestoreOutcome::NothingToRestore);
    };

    download_artifact(deps.store, &artifact, &ctx.encrypted_dump).await?;
    decrypt_dump(deps.runner, ctx, &restore_config.private_key_file)?;
    decompress_dump(deps.runner, ctx)?;

    let tables_dropped = clear_schema(schema.as_mut(), &app_config.database.schema).await?;
    schema.close().await?;

    load_dump(deps.runner, &app_config.database, ctx, restore_config.stop_on_error)?;

    Ok(RestoreOutcome::Restored {
        artifact,
        tables_dropped,
    })
}
