//! Store configuration and process bootstrap.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::event_store::{EventStore, FileEventStore, InMemoryEventStore};

pub const STORE_VAR: &str = "STELA_STORE";
pub const DATA_PATH_VAR: &str = "STELA_DATA_PATH";
pub const SYNC_WRITES_VAR: &str = "STELA_SYNC_WRITES";

pub const DEFAULT_DATA_PATH: &str = "stela-events.jsonl";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("STELA_STORE must be 'memory' or 'file' (got '{0}')")]
    UnknownBackend(String),

    #[error("{var} must be 'true' or 'false' (got '{value}')")]
    InvalidBool { var: &'static str, value: String },
}

/// Where events are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreBackend {
    InMemory,
    File { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// `sync_data` after every append. Only meaningful for the file backend.
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,
}

fn default_sync_writes() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::file(DEFAULT_DATA_PATH)
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            backend: StoreBackend::InMemory,
            sync_writes: default_sync_writes(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::File { path: path.into() },
            sync_writes: default_sync_writes(),
        }
    }

    /// Read `STELA_STORE`, `STELA_DATA_PATH` and `STELA_SYNC_WRITES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with variables supplied by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sync_writes = match lookup(SYNC_WRITES_VAR) {
            None => default_sync_writes(),
            Some(value) => value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidBool {
                var: SYNC_WRITES_VAR,
                value,
            })?,
        };

        let backend = match lookup(STORE_VAR).as_deref().map(str::trim) {
            None | Some("file") => StoreBackend::File {
                path: lookup(DATA_PATH_VAR)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            },
            Some("memory") => StoreBackend::InMemory,
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        Ok(Self { backend, sync_writes })
    }
}

/// Build the configured store.
pub fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn EventStore>> {
    match &config.backend {
        StoreBackend::InMemory => {
            info!("using in-memory event store");
            Ok(Arc::new(InMemoryEventStore::new()))
        }
        StoreBackend::File { path } => {
            let store = FileEventStore::open(path, config.sync_writes)
                .with_context(|| format!("failed to open event log at {}", path.display()))?;
            Ok(Arc::new(store))
        }
    }
}

/// Install tracing, read configuration from the environment and open the store.
pub fn bootstrap() -> anyhow::Result<Arc<dyn EventStore>> {
    stela_observability::init();
    let config = StoreConfig::from_env().context("invalid store configuration")?;
    info!(backend = ?config.backend, sync_writes = config.sync_writes, "bootstrapping event store");
    open_store(&config)
}
