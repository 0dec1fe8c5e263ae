// dbvault/src/artifact/mod.rs
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::storage::RemoteObject;

const ARTIFACT_PREFIX: &str = "db-";
const ARTIFACT_SUFFIX: &str = ".sql.gz.enc";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d__%H-%M-%S";
const MEBIBYTE: u64 = 1024 * 1024;

/// Remote name for a dump taken at `at`, e.g. `db-2024-02-01__03-00-00.sql.gz.enc`.
pub fn artifact_name<T: TimeZone>(at: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    format!("{}{}{}", ARTIFACT_PREFIX, at.format(TIMESTAMP_FORMAT), ARTIFACT_SUFFIX)
}

/// Artifact name for the current instant in `zone`.
pub fn artifact_name_now(zone: Tz) -> String {
    artifact_name(&Utc::now().with_timezone(&zone))
}

/// The most recently modified object, or `None` when the listing is empty.
pub fn select_latest(objects: &[RemoteObject]) -> Option<&RemoteObject> {
    objects
        .iter()
        .max_by(|a, b| a.modified_time.cmp(&b.modified_time))
}

/// Size in mebibytes rounded to two decimals, e.g. `2.0 MB` or `1.18 MB`.
pub fn format_size_mb(bytes: u64) -> String {
    let mb = (Decimal::from(bytes) / Decimal::from(MEBIBYTE)).round_dp(2).normalize();
    let mut rendered = mb.to_string();
    if !rendered.contains('.') {
        rendered.push_str(".0");
    }
    format!("{} MB", rendered)
}

/// Listing order for operators: newest artifact first.
pub fn newest_first(mut objects: Vec<RemoteObject>) -> Vec<RemoteObject> {
    objects.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
    objects
}

pub fn render_listing(objects: &[RemoteObject]) -> String {
    objects
        .iter()
        .map(|o| format!("{:<26} {:>12}  {}", o.modified_time, format_size_mb(o.size), o.name))
        .collect::<Vec<_>>()
        .join("\n")
}
