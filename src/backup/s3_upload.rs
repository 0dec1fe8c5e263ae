// dbvault/src/backup/s3_upload.rs
use chrono_tz::Tz;

use crate::artifact::artifact_name_now;
use crate::errors::Result;
use crate::storage::RemoteStore;
use crate::utils::workspace::RunContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedArtifact {
    pub name: String,
    pub id: String,
}

/// Uploads the encrypted dump under a timestamped artifact name.
pub async fn upload_dump(
    store: &dyn RemoteStore,
    ctx: &RunContext,
    zone: Tz,
) -> Result<UploadedArtifact> {
    let name = artifact_name_now(zone);
    println!("📂 Starting upload of {}", name);
    let id = store.upload_file(&ctx.encrypted_dump, &name).await?;
    println!("🚀 Uploaded, file ID: {}", id);
    Ok(UploadedArtifact { name, id })
}
