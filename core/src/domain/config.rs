// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Core configuration, loaded from `mutabaah-config.yaml` at startup. Selects
// the locking mode, the storage backend, and the event bus capacity. The
// in-memory backend is the default for development and testing; PostgreSQL
// for production.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::locking::LockingMode;
use crate::domain::repository::{PostgresConfig, StorageBackend};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("postgres backend selected but no connection string configured")]
    MissingConnectionString,

    #[error("unknown storage backend '{0}'")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub locking: LockingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub events: EventConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LockingConfig {
    #[serde(default)]
    pub mode: LockingMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "memory" or "postgres"
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            connection_string: None,
        }
    }
}

fn default_backend() -> String {
    "memory".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    1000
}

impl CoreConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn storage_backend(&self) -> Result<StorageBackend, ConfigError> {
        match self.storage.backend.as_str() {
            "memory" => Ok(StorageBackend::InMemory),
            "postgres" => {
                let connection_string = self
                    .storage
                    .connection_string
                    .clone()
                    .ok_or(ConfigError::MissingConnectionString)?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string,
                }))
            }
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::from_yaml("{}").unwrap();
        assert_eq!(config.locking.mode, LockingMode::Monthly);
        assert_eq!(config.events.capacity, 1000);
        assert!(matches!(
            config.storage_backend().unwrap(),
            StorageBackend::InMemory
        ));
    }

    #[test]
    fn test_full_config_round_trip() {
        let yaml = r#"
locking:
  mode: weekly
storage:
  backend: postgres
  connection_string: postgres://mutabaah@localhost/mutabaah
events:
  capacity: 64
"#;
        let config = CoreConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.locking.mode, LockingMode::Weekly);
        assert_eq!(config.events.capacity, 64);
        match config.storage_backend().unwrap() {
            StorageBackend::PostgreSQL(pg) => {
                assert_eq!(pg.connection_string, "postgres://mutabaah@localhost/mutabaah");
            }
            other => panic!("unexpected backend: {:?}", other),
        }
    }

    #[test]
    fn test_postgres_without_connection_string_fails() {
        let config = CoreConfig::from_yaml("storage:\n  backend: postgres\n").unwrap();
        assert!(matches!(
            config.storage_backend(),
            Err(ConfigError::MissingConnectionString)
        ));
    }

    #[test]
    fn test_unknown_backend_fails() {
        let config = CoreConfig::from_yaml("storage:\n  backend: sled\n").unwrap();
        assert!(matches!(
            config.storage_backend(),
            Err(ConfigError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "locking:\n  mode: monthly").unwrap();
        let config = CoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.locking.mode, LockingMode::Monthly);
    }
}
