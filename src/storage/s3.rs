// dbvault/src/storage/s3.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use aws_sdk_s3::error::DisplayErrorContext;
use chrono::{DateTime, SecondsFormat, Utc};
use s3::config::Region;
use s3::primitives::ByteStream;
use s3::types::Object;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::{ProgressReporter, RemoteObject, RemoteStore};
use crate::config::SpacesConfig;
use crate::errors::{AppError, Result};
use crate::utils::silent_remove_file;

/// Page size requested from ListObjectsV2; every page is read.
const LIST_PAGE_SIZE: i32 = 1000;

/// S3-compatible store (AWS, DigitalOcean Spaces, MinIO) scoped to one
/// bucket and optional key prefix.
///
/// The client is the run's credential handle: built once in [`S3Store::connect`]
/// and reused for every call.
pub struct S3Store {
    client: s3::Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3Store {
    pub async fn connect(spaces_config: &SpacesConfig) -> Self {
        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(spaces_config.region.clone()));

        if let Some(endpoint) = &spaces_config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        // Without static keys the default provider chain (env, profile, IMDS) applies.
        if let (Some(key_id), Some(secret)) = (
            &spaces_config.access_key_id,
            &spaces_config.secret_access_key,
        ) {
            loader = loader.credentials_provider(s3::config::Credentials::new(
                key_id, secret, None, None, "Static",
            ));
        }

        let sdk_config = loader.load().await;
        tracing::debug!(
            bucket = %spaces_config.bucket_name,
            prefix = ?spaces_config.folder_prefix,
            "object store client ready"
        );

        Self {
            client: s3::Client::new(&sdk_config),
            bucket: spaces_config.bucket_name.clone(),
            prefix: spaces_config.folder_prefix.clone(),
        }
    }

    fn key_for(&self, name: &str) -> String {
        object_key(self.prefix.as_deref(), name)
    }

    fn list_prefix(&self) -> Option<String> {
        self.prefix.as_ref().map(|p| format!("{}/", p))
    }
}

fn object_key(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix, name),
        None => name.to_string(),
    }
}

/// Name of `key` relative to the container, for direct children only.
fn object_name<'a>(prefix: Option<&str>, key: &'a str) -> Option<&'a str> {
    let name = match prefix {
        Some(prefix) => key.strip_prefix(prefix)?.strip_prefix('/')?,
        None => key,
    };
    if name.is_empty() || name.contains('/') {
        None
    } else {
        Some(name)
    }
}

/// Renders an S3 timestamp with a fixed width so string order matches time order.
fn format_modified(secs: i64, nanos: u32) -> String {
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Direct children of the container found in one listing page.
fn page_objects(prefix: Option<&str>, bucket: &str, contents: &[Object]) -> Vec<RemoteObject> {
    contents
        .iter()
        .filter_map(|object| {
            let key = object.key()?;
            let name = object_name(prefix, key)?;
            let modified_time = object
                .last_modified()
                .map(|dt| format_modified(dt.secs(), dt.subsec_nanos()))
                .unwrap_or_default();
            Some(RemoteObject {
                name: name.to_string(),
                id: key.to_string(),
                modified_time,
                size: object.size().unwrap_or(0).max(0) as u64,
                container: bucket.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl RemoteStore for S3Store {
    /// Walks every ListObjectsV2 page. Keys come back in ascending order, so
    /// stopping at the first page would hide the newest artifacts.
    async fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(self.list_prefix())
            .max_keys(LIST_PAGE_SIZE)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        let mut page_count = 0usize;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                AppError::Storage(format!(
                    "Failed to list objects in bucket {}: {}",
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;
            page_count += 1;
            objects.extend(page_objects(
                self.prefix.as_deref(),
                &self.bucket,
                page.contents(),
            ));
        }

        tracing::debug!(
            bucket = %self.bucket,
            pages = page_count,
            count = objects.len(),
            "listed objects"
        );
        Ok(objects)
    }

    async fn upload_file(&self, local_path: &Path, name: &str) -> Result<String> {
        let key = self.key_for(name);
        tracing::debug!(
            file = %local_path.display(),
            bucket = %self.bucket,
            key = %key,
            "uploading"
        );

        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to read {} for upload: {}",
                local_path.display(),
                e
            ))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to upload {} to bucket {} with key {}: {}",
                    local_path.display(),
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(key)
    }

    async fn resolve_id_by_name(&self, name: &str) -> Result<String> {
        let key = self.key_for(name);
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to look up {} in bucket {}: {}",
                    name,
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;

        output
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .find(|candidate| *candidate == key)
            .map(str::to_string)
            .ok_or_else(|| AppError::NotFound(format!("{} in bucket {}", name, self.bucket)))
    }

    async fn download_object(&self, id: &str, destination: &Path) -> Result<u64> {
        silent_remove_file(destination)?;
        if let Some(parent_dir) = destination.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                tokio::fs::create_dir_all(parent_dir).await?;
            }
        }

        let mut object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to get object s3://{}/{}: {}",
                    self.bucket,
                    id,
                    DisplayErrorContext(&e)
                ))
            })?;

        let mut output_file = File::create(destination).await?;
        let total = object.content_length().and_then(|len| u64::try_from(len).ok());
        let mut progress = ProgressReporter::new(total);

        while let Some(chunk) = object.body.try_next().await.map_err(|e| {
            AppError::Storage(format!("Download of s3://{}/{} interrupted: {}", self.bucket, id, e))
        })? {
            output_file.write_all(&chunk).await?;
            if let Some(percent) = progress.advance(chunk.len() as u64) {
                println!("Download {}%.", percent);
            }
        }
        output_file.flush().await?;

        tracing::debug!(
            key = %id,
            bytes = progress.received(),
            file = %destination.display(),
            "download finished"
        );
        Ok(progress.received())
    }
}
