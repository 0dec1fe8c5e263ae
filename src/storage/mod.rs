// dbvault/src/storage/mod.rs
pub(crate) mod s3;

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

use crate::errors::Result;

pub use s3::S3Store;

/// Metadata for one object in the remote container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteObject {
    pub name: String,
    pub id: String,
    /// Fixed-width RFC 3339 UTC timestamp; lexical order is chronological order.
    pub modified_time: String,
    pub size: u64,
    pub container: String,
}

/// Remote object store bound to a single container.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Lists every object directly in the container. An empty list is not an error.
    async fn list_objects(&self) -> Result<Vec<RemoteObject>>;

    /// Uploads `local_path` as a new object called `name` and returns its id.
    async fn upload_file(&self, local_path: &Path, name: &str) -> Result<String>;

    /// Id of the first object named exactly `name`; `NotFound` otherwise.
    async fn resolve_id_by_name(&self, name: &str) -> Result<String>;

    /// Streams object `id` into a freshly created `destination`, returning the byte count.
    async fn download_object(&self, id: &str, destination: &Path) -> Result<u64>;
}

/// Prints download progress in 10% steps when the total size is known.
#[derive(Debug)]
pub(crate) struct ProgressReporter {
    total: Option<u64>,
    received: u64,
    last_reported: u64,
}

impl ProgressReporter {
    pub(crate) fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            received: 0,
            last_reported: 0,
        }
    }

    /// Records `bytes` more and returns the percentage to report, if a new 10% step was crossed.
    pub(crate) fn advance(&mut self, bytes: u64) -> Option<u64> {
        self.received += bytes;
        let total = self.total?;
        let percent = (self.received.min(total) * 100 / total) / 10 * 10;
        if percent > self.last_reported {
            self.last_reported = percent;
            Some(percent)
        } else {
            None
        }
    }

    pub(crate) fn received(&self) -> u64 {
        self.received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_reports_each_ten_percent_once() {
        let mut progress = ProgressReporter::new(Some(1000));
        assert_eq!(progress.advance(50), None);
        assert_eq!(progress.advance(60), Some(10));
        assert_eq!(progress.advance(5), None);
        assert_eq!(progress.advance(400), Some(50));
        assert_eq!(progress.advance(485), Some(100));
        assert_eq!(progress.received(), 1000);
    }

    #[test]
    fn test_progress_without_total_only_counts() {
        let mut progress = ProgressReporter::new(None);
        assert_eq!(progress.advance(4096), None);
        assert_eq!(progress.received(), 4096);

        let mut empty = ProgressReporter::new(Some(0));
        assert_eq!(empty.advance(10), None);
    }
}
