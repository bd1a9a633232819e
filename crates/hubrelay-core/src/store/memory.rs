// # Memory Lease Store
//
// In-memory implementation of LeaseStore.
//
// ## Purpose
//
// Provides a simple, fast lease store that doesn't persist across
// restarts. Useful for testing, single-instance deployments, and setups
// where a restart simply means subscribers re-verify on the hub's next
// cycle.
//
// ## Crash Behavior
//
// - All leases are lost on restart/crash
// - First verification request after a restart is treated as first-time
//   (confirmed), and the lease re-forms with the next heartbeat

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Error;
use crate::traits::lease_store::{LeaseRecord, LeaseStore, LeaseStoreFactory};

/// In-memory lease store implementation
///
/// All state lives in a HashMap protected by a RwLock. The conditional
/// delete holds the write lock across the staleness re-check and the
/// removal, which is what makes it safe against concurrent heartbeats.
///
/// # Example
///
/// ```rust,no_run
/// use hubrelay_core::store::MemoryLeaseStore;
/// use hubrelay_core::traits::lease_store::{LeaseRecord, LeaseStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryLeaseStore::new();
///
///     let now = chrono::Utc::now();
///     store.set("abc123", LeaseRecord::new(now)).await?;
///
///     let record = store.get("abc123").await?;
///     assert_eq!(record, Some(LeaseRecord::new(now)));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaseStore {
    inner: Arc<RwLock<HashMap<String, LeaseRecord>>>,
}

impl MemoryLeaseStore {
    /// Create a new empty memory lease store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of leases in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Clear all leases from the store
    pub async fn clear(&self) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.clear();
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn get(&self, subscription_id: &str) -> Result<Option<LeaseRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(subscription_id).copied())
    }

    async fn set(&self, subscription_id: &str, record: LeaseRecord) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(subscription_id.to_string(), record);
        Ok(())
    }

    async fn delete(&self, subscription_id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(subscription_id);
        Ok(())
    }

    async fn delete_if_stale(
        &self,
        subscription_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let mut guard = self.inner.write().await;
        match guard.get(subscription_id) {
            Some(record) if record.last_seen < cutoff => {
                guard.remove(subscription_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        // No-op for memory store (everything is already "persisted")
        Ok(())
    }
}

/// Factory for config-driven construction of memory stores
#[derive(Debug, Default)]
pub struct MemoryLeaseStoreFactory;

#[async_trait]
impl LeaseStoreFactory for MemoryLeaseStoreFactory {
    async fn create(
        &self,
        _config: &serde_json::Value,
    ) -> Result<Box<dyn LeaseStore>, Error> {
        Ok(Box::new(MemoryLeaseStore::new()))
    }
}
