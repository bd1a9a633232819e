//! Push-entry dispatch
//!
//! The dispatcher fans parsed entries out to in-process listeners keyed by
//! subscription id. Registration is a plain multi-map operation and is
//! independent of lease state: a process may listen before any lease
//! exists, and a lease may outlive every listener.
//!
//! Delivery semantics:
//!
//! - Entries from one dispatch call reach each listener in payload order.
//! - No ordering is promised across different subscription ids.
//! - Zero registered listeners means the entries are dropped, not an error.
//! - There is no buffering and no redelivery; listeners not registered at
//!   dispatch time miss the event.
//!
//! The registry owns the listener references; listeners never own the
//! registry.

use crate::traits::PushEntry;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

/// A registered push-entry callback
///
/// Invoked once per delivered entry.
pub type Listener = Arc<dyn Fn(&PushEntry) + Send + Sync>;

/// Handle identifying one registration, for later removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// In-process listener registry and fan-out
///
/// Shared across all request-handling tasks; the multi-map is guarded by a
/// RwLock so concurrent registration and concurrent publishing cannot
/// corrupt it. Dispatch snapshots the current listener list under the read
/// lock and delivers outside it, so a slow listener never blocks
/// registration.
#[derive(Default)]
pub struct Dispatcher {
    listeners: RwLock<HashMap<String, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for a subscription id
    ///
    /// Any number of listeners may be registered per id; they are invoked
    /// in registration order. An empty id registers nothing and returns a
    /// handle that removes nothing.
    pub async fn on(&self, subscription_id: &str, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        if subscription_id.is_empty() {
            warn!("Ignoring listener registration without a subscription id");
            return id;
        }

        let mut guard = self.listeners.write().await;
        guard
            .entry(subscription_id.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove a previously registered listener
    ///
    /// # Returns
    ///
    /// `true` if the listener was found and removed
    pub async fn off(&self, subscription_id: &str, listener_id: ListenerId) -> bool {
        let mut guard = self.listeners.write().await;
        let Some(entries) = guard.get_mut(subscription_id) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(id, _)| *id != listener_id);
        let removed = entries.len() < before;

        if entries.is_empty() {
            guard.remove(subscription_id);
        }
        removed
    }

    /// Register a stream-backed listener for a subscription id
    ///
    /// Entries delivered to the id are cloned into an unbounded channel;
    /// the returned stream yields them in delivery order. Dropping the
    /// stream does not deregister the listener; call [`Dispatcher::off`]
    /// with the returned handle for that.
    pub async fn watch(
        &self,
        subscription_id: &str,
    ) -> (ListenerId, UnboundedReceiverStream<PushEntry>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let listener: Listener = Arc::new(move |entry: &PushEntry| {
            let _ = tx.send(entry.clone());
        });
        let id = self.on(subscription_id, listener).await;
        (id, UnboundedReceiverStream::new(rx))
    }

    /// Publish entries to every listener registered for a subscription id
    ///
    /// Each entry is delivered to each listener in payload order. Listeners
    /// registered while delivery is in flight see only later dispatch
    /// calls.
    ///
    /// # Returns
    ///
    /// The number of listener invocations performed (listeners x entries)
    pub async fn dispatch(&self, subscription_id: &str, entries: &[PushEntry]) -> usize {
        if subscription_id.is_empty() {
            warn!("Dropping dispatch without a subscription id");
            return 0;
        }
        if entries.is_empty() {
            return 0;
        }

        // Snapshot under the read lock; deliver outside it.
        let snapshot: Vec<Listener> = {
            let guard = self.listeners.read().await;
            match guard.get(subscription_id) {
                Some(registered) => registered.iter().map(|(_, l)| l.clone()).collect(),
                None => Vec::new(),
            }
        };

        if snapshot.is_empty() {
            debug!(
                subscription_id,
                entries = entries.len(),
                "No listeners registered, dropping entries"
            );
            return 0;
        }

        let mut deliveries = 0;
        for entry in entries {
            for listener in &snapshot {
                listener(entry);
                deliveries += 1;
            }
        }
        deliveries
    }

    /// Number of listeners currently registered for a subscription id
    pub async fn listener_count(&self, subscription_id: &str) -> usize {
        let guard = self.listeners.read().await;
        guard.get(subscription_id).map_or(0, Vec::len)
    }
}
