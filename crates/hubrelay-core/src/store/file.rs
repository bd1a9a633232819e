// # File Lease Store
//
// File-based implementation of LeaseStore with crash recovery.
//
// ## Purpose
//
// Persists leases across daemon restarts so an active subscriber is not
// treated as first-time after a crash.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// Timestamps are integer milliseconds since the Unix epoch:
//
// ```json
// {
//   "version": "1.0",
//   "leases": {
//     "abc123": { "last_seen": 1700000000123 }
//   }
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::LeaseStoreConfig;
use crate::traits::lease_store::{LeaseRecord, LeaseStore, LeaseStoreFactory};

/// Lease file format version
/// Used for future migration if format changes
const LEASE_FILE_VERSION: &str = "1.0";

/// File-based lease store with crash recovery
///
/// Persists leases to a JSON file with atomic writes and automatic
/// corruption recovery.
///
/// # Crash Recovery
///
/// - **Atomic writes**: New state written to temporary file, then renamed
/// - **Backup**: Last known good state kept in `.backup` file
/// - **Corruption detection**: JSON validation on load
/// - **Automatic recovery**: Falls back to backup if main file corrupted
#[derive(Debug)]
pub struct FileLeaseStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

/// Internal state for the file-based store
#[derive(Debug)]
struct FileState {
    leases: HashMap<String, LeaseRecord>,
    dirty: bool,
}

/// Serializable lease file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct LeaseFileFormat {
    version: String,
    leases: HashMap<String, LeaseRecord>,
}

impl FileLeaseStore {
    /// Create or load a file lease store
    ///
    /// This will:
    /// 1. Try to load the existing lease file
    /// 2. If corruption is detected, try to load from backup
    /// 3. If both fail, start with empty state
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create lease directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let leases = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                leases,
                dirty: false,
            })),
        })
    }

    /// Load leases from file with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load the main lease file
    /// 2. On a JSON parse error, try loading the backup
    /// 3. If the backup also fails, start with empty state
    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, LeaseRecord>, Error> {
        match Self::load(path).await {
            Ok(leases) => {
                tracing::debug!("Loaded lease file: {} leases", leases.len());
                Ok(leases)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Lease file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty state.");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(leases) => {
                        tracing::info!("Recovered leases from backup: {} leases", leases.len());

                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore lease file from backup: {}",
                                restore_err
                            );
                        }

                        Ok(leases)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unreadable: {}. Starting with empty state.",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Load leases from a file
    async fn load(path: &Path) -> Result<HashMap<String, LeaseRecord>, Error> {
        if !path.exists() {
            tracing::debug!("Lease file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::lease_store(format!(
                "Failed to read lease file {}: {}",
                path.display(),
                e
            ))
        })?;

        let lease_file: LeaseFileFormat = serde_json::from_str(&content)?;

        if lease_file.version != LEASE_FILE_VERSION {
            tracing::warn!(
                "Lease file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                LEASE_FILE_VERSION,
                lease_file.version
            );
        }

        Ok(lease_file.leases)
    }

    /// Write leases to file atomically
    async fn write_state(&self) -> Result<(), Error> {
        let json = {
            let state_guard = self.state.read().await;
            let lease_file = LeaseFileFormat {
                version: LEASE_FILE_VERSION.to_string(),
                leases: state_guard.leases.clone(),
            };
            serde_json::to_string_pretty(&lease_file)?
        };

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::lease_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::lease_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::lease_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Create backup of current file (if it exists)
        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::lease_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        {
            let mut state_guard = self.state.write().await;
            state_guard.dirty = false;
        }

        tracing::trace!("Leases written to file: {}", self.path.display());
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Force immediate write to disk
    pub async fn sync(&self) -> Result<(), Error> {
        self.write_state().await
    }
}

#[async_trait]
impl LeaseStore for FileLeaseStore {
    async fn get(&self, subscription_id: &str) -> Result<Option<LeaseRecord>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.leases.get(subscription_id).copied())
    }

    async fn set(&self, subscription_id: &str, record: LeaseRecord) -> Result<(), Error> {
        {
            let mut state_guard = self.state.write().await;
            state_guard
                .leases
                .insert(subscription_id.to_string(), record);
            state_guard.dirty = true;
        }

        // Immediate write for durability
        self.write_state().await
    }

    async fn delete(&self, subscription_id: &str) -> Result<(), Error> {
        {
            let mut state_guard = self.state.write().await;
            state_guard.leases.remove(subscription_id);
            state_guard.dirty = true;
        }

        // Immediate write for durability
        self.write_state().await
    }

    async fn delete_if_stale(
        &self,
        subscription_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let removed = {
            let mut state_guard = self.state.write().await;
            match state_guard.leases.get(subscription_id) {
                Some(record) if record.last_seen < cutoff => {
                    state_guard.leases.remove(subscription_id);
                    state_guard.dirty = true;
                    true
                }
                _ => false,
            }
        };

        if removed {
            self.write_state().await?;
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.leases.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        let state_guard = self.state.read().await;
        if state_guard.dirty {
            drop(state_guard);
            self.write_state().await
        } else {
            Ok(())
        }
    }
}

/// Factory for config-driven construction of file stores
///
/// Accepts the serialized [`LeaseStoreConfig::File`] variant.
#[derive(Debug, Default)]
pub struct FileLeaseStoreFactory;

#[async_trait]
impl LeaseStoreFactory for FileLeaseStoreFactory {
    async fn create(
        &self,
        config: &serde_json::Value,
    ) -> Result<Box<dyn LeaseStore>, Error> {
        let config: LeaseStoreConfig = serde_json::from_value(config.clone())?;
        match config {
            LeaseStoreConfig::File { path } => {
                Ok(Box::new(FileLeaseStore::new(path).await?))
            }
            other => Err(Error::config(format!(
                "File store factory cannot build a '{}' store",
                other.type_name()
            ))),
        }
    }
}
