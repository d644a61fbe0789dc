use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rek_journal::{JournalConfig, SyncMode};
use rek_ledger::{EngineConfig, RetryConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server settings, usually read from `rek.toml`. Missing keys take their
/// default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Holds `catalog.json` and the `ledger/` journal directory.
    pub data_dir: PathBuf,
    pub sync_mode: SyncMode,
    pub lock_timeout_ms: u64,
    /// Attempts per operation on lock contention, including the first.
    pub max_retries: u32,
    /// Fill an empty catalog with demo data and book its opening stock.
    pub seed_catalog: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            data_dir: PathBuf::from("rek-data"),
            sync_mode: SyncMode::default(),
            lock_timeout_ms: 2000,
            max_retries: 3,
            seed_catalog: false,
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("catalog.json")
    }

    pub fn ledger_dir(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            retry: RetryConfig {
                max_attempts: self.max_retries.max(1),
                ..RetryConfig::default()
            },
            journal: JournalConfig {
                sync_mode: self.sync_mode,
            },
        }
    }
}
