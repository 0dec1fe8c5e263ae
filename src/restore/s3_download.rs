// dbvault/src/restore/s3_download.rs
use std::path::Path;

use crate::artifact::{format_size_mb, select_latest};
use crate::errors::Result;
use crate::storage::{RemoteObject, RemoteStore};

/// Picks the newest remote artifact, or `None` when the container is empty.
pub async fn select_latest_artifact(store: &dyn RemoteStore) -> Result<Option<RemoteObject>> {
    let objects = store.list_objects().await?;
    let Some(latest) = select_latest(&objects) else {
        println!("No files found.");
        return Ok(None);
    };
    println!(
        "⏳ Last backup in storage is {}, {}, download it",
        latest.name,
        format_size_mb(latest.size)
    );
    Ok(Some(latest.clone()))
}

/// Downloads `artifact` to `destination`, looking its id up by name first.
pub async fn download_artifact(
    store: &dyn RemoteStore,
    artifact: &RemoteObject,
    destination: &Path,
) -> Result<u64> {
    let id = store.resolve_id_by_name(&artifact.name).await?;
    let bytes = store.download_object(&id, destination).await?;
    println!("🚀 Downloaded");
    Ok(bytes)
}
