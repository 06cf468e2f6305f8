//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{env, fmt, path::PathBuf, str::FromStr};
use uuid::Uuid;

/// Which Entity Store backend the service runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("Unknown STORE_BACKEND: {}", other)),
        }
    }
}

/// How re-locking an already-locked asset is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Re-locking overwrites the current holder
    #[default]
    LastWriterWins,
    /// A live lock held by someone else blocks re-locking
    RejectLive,
}

impl FromStr for LockPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "last_writer_wins" | "steal" => Ok(LockPolicy::LastWriterWins),
            "reject_live" | "strict" => Ok(LockPolicy::RejectLive),
            other => Err(anyhow!("Unknown ASSET_LOCK_POLICY: {}", other)),
        }
    }
}

impl fmt::Display for LockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockPolicy::LastWriterWins => write!(f, "last_writer_wins"),
            LockPolicy::RejectLive => write!(f, "reject_live"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Entity Store backend
    pub store_backend: StoreBackend,

    /// Database connection URL, required for the Postgres backend
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    /// Asset lock re-lock policy
    pub lock_policy: LockPolicy,

    /// Identity the merge job executor acts as
    pub automation_user_id: Option<Uuid>,

    /// Root directory of the filesystem blob store
    pub asset_storage_path: PathBuf,

    /// Runtime configuration
    pub rust_log: String,
    pub log_format: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let store_backend: StoreBackend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL is required"));
        }

        let automation_user_id = match env::var("MERGE_AUTOMATION_USER_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                Uuid::parse_str(raw.trim())
                    .map_err(|e| anyhow!("MERGE_AUTOMATION_USER_ID is not a UUID: {}", e))?,
            ),
            _ => None,
        };

        let config = Self {
            store_backend,
            database_url,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            lock_policy: env::var("ASSET_LOCK_POLICY")
                .map(|v| v.parse())
                .unwrap_or(Ok(LockPolicy::default()))?,
            automation_user_id,
            asset_storage_path: env::var("ASSET_STORAGE_PATH")
                .unwrap_or_else(|_| "./depot-storage".to_string())
                .into(),
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "depot=debug".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
        };

        Ok(config)
    }
}
