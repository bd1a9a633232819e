// # Lease Store Trait
//
// Defines the interface for persisting subscription liveness state.
//
// ## Purpose
//
// The lease store tracks one record per subscription id: the time the
// owning application last confirmed the subscriber was active. The lease
// policy reads these records to decide whether a hub verification request
// should be confirmed, and deletes them when a lease has gone stale.
//
// Absence of a record means "never subscribed or already evicted".
//
// ## Implementations
//
// - In-memory: HashMap behind a RwLock
// - File-based: JSON file with atomic writes and crash recovery
// - Future: Redis, SQLite, etc.
//
// ## Stored Representation
//
// Timestamps are persisted as integer milliseconds since the Unix epoch.
// In-process they are `chrono::DateTime<Utc>`; the serde attribute on
// [`LeaseRecord`] pins the wire format so no implementation is tempted to
// compare strings against numbers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Liveness record for one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LeaseRecord {
    /// When the owning application last saw this subscriber active
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_seen: DateTime<Utc>,
}

impl LeaseRecord {
    /// Create a record seen at the given instant
    pub fn new(last_seen: DateTime<Utc>) -> Self {
        Self { last_seen }
    }

    /// Check whether the record is stale at `now` for the given maximum age
    ///
    /// The comparison is strict: a gap exactly equal to `max_age` still
    /// counts as alive, so a heartbeat landing on the boundary does not
    /// flap between verdicts.
    pub fn is_stale(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_seen) > max_age
    }
}

/// Trait for lease store implementations
///
/// This trait defines the interface for persistent liveness storage.
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
/// Concurrent operations on *different* subscription ids must never
/// interfere; operations on the *same* id are serialized only to the
/// extent the backing store provides atomicity.
///
/// # Conditional Deletion
///
/// [`LeaseStore::delete_if_stale`] exists so the policy can evict a stale
/// lease without racing a concurrent heartbeat: the staleness re-check and
/// the removal must happen as one step inside the store. A plain
/// read-then-delete sequence at the policy layer could evict a subscriber
/// whose heartbeat arrived between the two calls.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Get the lease record for a subscription id
    ///
    /// # Returns
    ///
    /// - `Ok(Some(LeaseRecord))`: The current record
    /// - `Ok(None)`: No record (never subscribed or already evicted)
    /// - `Err(Error)`: Storage error
    async fn get(&self, subscription_id: &str) -> Result<Option<LeaseRecord>, crate::Error>;

    /// Create or overwrite the lease record for a subscription id
    async fn set(&self, subscription_id: &str, record: LeaseRecord) -> Result<(), crate::Error>;

    /// Delete the lease record for a subscription id
    ///
    /// Deleting an absent record is not an error.
    async fn delete(&self, subscription_id: &str) -> Result<(), crate::Error>;

    /// Delete the record only if its `last_seen` is strictly older than `cutoff`
    ///
    /// The check and the removal happen atomically with respect to
    /// concurrent `set` calls on the same id.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: A stale record existed and was removed
    /// - `Ok(false)`: No record, or the record was refreshed to `cutoff` or later
    /// - `Err(Error)`: Storage error
    async fn delete_if_stale(
        &self,
        subscription_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, crate::Error>;

    /// List all subscription ids with a lease record
    async fn list(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    ///
    /// Some implementations may buffer writes. This ensures all changes
    /// are flushed to persistent storage.
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing lease stores from configuration
///
/// Creation is async because some stores (the file store, a future Redis
/// store) perform I/O while loading their initial state.
#[async_trait]
pub trait LeaseStoreFactory: Send + Sync {
    /// Create a LeaseStore instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this store type
    async fn create(
        &self,
        config: &serde_json::Value,
    ) -> Result<Box<dyn LeaseStore>, crate::Error>;
}
