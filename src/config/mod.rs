// dbvault/src/config/mod.rs
use chrono_tz::Tz;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use url::Url;

use crate::errors::{AppError, Result};

const DEFAULT_DB_HOSTNAME: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_SCHEMA: &str = "public";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_TIME_ZONE: &str = "Europe/Moscow";
const DEFAULT_WORK_DIR: &str = "/tmp";

/// Raw environment values, before validation.
///
/// Kept as a plain map so tests can build configurations without touching
/// the process environment.
#[derive(Clone, Default)]
pub struct RawEnvConfig {
    values: HashMap<String, String>,
}

// Values may hold credentials; only key names are printed.
impl fmt::Debug for RawEnvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("RawEnvConfig").field("keys", &keys).finish()
    }
}

impl RawEnvConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self {
            values: env::vars().collect(),
        }
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value for `key`, treating blank values as unset.
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str, purpose: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| AppError::Config(format!("{} must be set ({})", key, purpose)))
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: Option<String>,
    pub schema: String,
}

/// S3-compatible storage settings. The bucket (plus optional key prefix) is
/// the container every artifact lives in.
#[derive(Debug, Clone)]
pub struct SpacesConfig {
    pub endpoint_url: Option<String>,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket_name: String,
    pub folder_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub public_key_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub private_key_file: PathBuf,
    pub stop_on_error: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub operation: Option<OperationConfig>,
    pub database: DatabaseConfig,
    pub spaces_config: SpacesConfig,
    pub time_zone: Tz,
    pub work_dir: PathBuf,
    pub raw_env_config: RawEnvConfig,
}

#[derive(Debug, Clone)]
pub enum OperationConfig {
    Backup(BackupConfig),
    Restore(RestoreConfig),
    List,
}

impl AppConfig {
    pub fn load_from_env() -> Result<Self> {
        Self::from_raw(RawEnvConfig::from_env())
    }

    pub fn from_raw(raw: RawEnvConfig) -> Result<Self> {
        let port = match raw.get("DB_PORT") {
            Some(port) => port.parse::<u16>().map_err(|e| {
                AppError::Config(format!("DB_PORT '{}' is not a valid port: {}", port, e))
            })?,
            None => DEFAULT_DB_PORT,
        };

        let database = DatabaseConfig {
            host: raw.get("DB_HOSTNAME").unwrap_or_else(|| DEFAULT_DB_HOSTNAME.to_string()),
            port,
            name: raw.require("DB_NAME", "database to dump or restore")?,
            user: raw.require("DB_USER", "database user")?,
            password: raw.get("DB_PASSWORD"),
            schema: raw.get("DB_SCHEMA").unwrap_or_else(|| DEFAULT_DB_SCHEMA.to_string()),
        };

        let endpoint_url = raw.get("SPACES_ENDPOINT_URL");
        if let Some(endpoint) = &endpoint_url {
            Url::parse(endpoint).map_err(|e| {
                AppError::Config(format!(
                    "SPACES_ENDPOINT_URL '{}' is not a valid URL: {}",
                    endpoint, e
                ))
            })?;
        }

        let access_key_id = raw.get("SPACES_ACCESS_KEY_ID");
        let secret_access_key = raw.get("SPACES_SECRET_ACCESS_KEY");
        if access_key_id.is_some() != secret_access_key.is_some() {
            return Err(AppError::Config(
                "SPACES_ACCESS_KEY_ID and SPACES_SECRET_ACCESS_KEY must be set together"
                    .to_string(),
            ));
        }

        let spaces_config = SpacesConfig {
            endpoint_url,
            region: raw.get("SPACES_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key_id,
            secret_access_key,
            bucket_name: raw.require("BACKUP_BUCKET", "remote container for artifacts")?,
            folder_prefix: raw
                .get("BACKUP_FOLDER_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty()),
        };

        let tz_name = raw.get("TIME_ZONE").unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string());
        let time_zone = tz_name.parse::<Tz>().map_err(|e| {
            AppError::Config(format!(
                "TIME_ZONE '{}' is not a known time zone: {}",
                tz_name, e
            ))
        })?;

        Ok(AppConfig {
            operation: None, // filled by main once the operation is chosen
            database,
            spaces_config,
            time_zone,
            work_dir: raw
                .get("BACKUP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR)),
            raw_env_config: raw,
        })
    }
}

pub fn load_backup_config(raw: &RawEnvConfig) -> Result<BackupConfig> {
    Ok(BackupConfig {
        public_key_file: PathBuf::from(
            raw.require("BACKUP_KEY_PUB_FILE", "public key used to encrypt dumps")?,
        ),
    })
}

pub fn load_restore_config(raw: &RawEnvConfig) -> Result<RestoreConfig> {
    let stop_on_error = match raw.get("RESTORE_STOP_ON_ERROR") {
        Some(v) => parse_flag("RESTORE_STOP_ON_ERROR", &v)?,
        None => false,
    };
    Ok(RestoreConfig {
        private_key_file: PathBuf::from(
            raw.require("BACKUP_KEY_PRIVATE_FILE", "private key used to decrypt dumps")?,
        ),
        stop_on_error,
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Config(format!("{} must be a boolean, got '{}'", key, other))),
    }
}
