// dbvault/src/safety/mod.rs
//! Preconditions checked before any destructive or expensive work starts.

use std::path::Path;

use crate::errors::{AppError, Result};

const RESTORE_HOST_PREFIX: &str = "loader-";
const RESTORE_HOST_SUFFIX: &str = ".local";

pub fn is_restore_target(hostname: &str) -> bool {
    hostname.starts_with(RESTORE_HOST_PREFIX) || hostname.ends_with(RESTORE_HOST_SUFFIX)
}

/// Refuses to restore anywhere except loader hosts (`loader-*`) and local
/// machines (`*.local`). Restoring wipes the target schema.
pub fn check_restore_target(hostname: &str) -> Result<()> {
    if !is_restore_target(hostname) {
        return Err(AppError::Precondition(format!(
            "It seems this is not a loader server ({}); refusing to restore",
            hostname
        )));
    }
    println!("We are on some loader or local server, ok");
    Ok(())
}

/// Requires the encryption key to exist before any dump or download begins.
pub fn check_key_file(path: &Path, role: &str) -> Result<()> {
    if !path.is_file() {
        return Err(AppError::Precondition(format!(
            "{} key ({}) not found. Generate a keypair with \
             `openssl req -x509 -nodes -newkey rsa:4096 \
             -keyout backup_key.pem -out backup_key.pem.pub` before running",
            role,
            path.display()
        )));
    }
    Ok(())
}
