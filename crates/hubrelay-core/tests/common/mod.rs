//! Test doubles and common utilities for relay contract tests
//!
//! These doubles instrument the trait seams with call counters so the
//! contracts can assert not just outcomes but which store operations were
//! (or were not) attempted.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hubrelay_core::error::Result;
use hubrelay_core::store::MemoryLeaseStore;
use hubrelay_core::traits::{LeaseRecord, LeaseStore, PayloadParser, PushEntry};
use hubrelay_core::{Listener, RelayConfig};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Timestamp helper: seconds since the epoch
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Default config with the standard 600 s threshold
pub fn default_config() -> RelayConfig {
    RelayConfig::default()
}

/// A lease store that counts every operation
///
/// Clones share both the underlying map and the counters, so a test can
/// keep a handle while boxing another clone into the relay.
#[derive(Clone, Default)]
pub struct CountingLeaseStore {
    inner: MemoryLeaseStore,
    sets: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
    conditional_deletes: Arc<AtomicUsize>,
}

impl CountingLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mutation_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
            + self.conditional_deletes.load(Ordering::SeqCst)
    }

    pub async fn record(&self, subscription_id: &str) -> Option<LeaseRecord> {
        self.inner.get(subscription_id).await.unwrap()
    }
}

#[async_trait]
impl LeaseStore for CountingLeaseStore {
    async fn get(&self, subscription_id: &str) -> Result<Option<LeaseRecord>> {
        self.inner.get(subscription_id).await
    }

    async fn set(&self, subscription_id: &str, record: LeaseRecord) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(subscription_id, record).await
    }

    async fn delete(&self, subscription_id: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(subscription_id).await
    }

    async fn delete_if_stale(&self, subscription_id: &str, cutoff: DateTime<Utc>) -> Result<bool> {
        self.conditional_deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_if_stale(subscription_id, cutoff).await
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.inner.list().await
    }

    async fn flush(&self) -> Result<()> {
        self.inner.flush().await
    }
}

/// A lease store whose reads fail, counting any mutation attempts
#[derive(Clone, Default)]
pub struct FailingLeaseStore {
    mutations: Arc<AtomicUsize>,
}

impl FailingLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeaseStore for FailingLeaseStore {
    async fn get(&self, _subscription_id: &str) -> Result<Option<LeaseRecord>> {
        Err(hubrelay_core::Error::lease_store("store unavailable"))
    }

    async fn set(&self, _subscription_id: &str, _record: LeaseRecord) -> Result<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Err(hubrelay_core::Error::lease_store("store unavailable"))
    }

    async fn delete(&self, _subscription_id: &str) -> Result<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Err(hubrelay_core::Error::lease_store("store unavailable"))
    }

    async fn delete_if_stale(&self, _subscription_id: &str, _cutoff: DateTime<Utc>) -> Result<bool> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Err(hubrelay_core::Error::lease_store("store unavailable"))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Line-oriented parser double
///
/// Each payload line is `content_url link`; lines with fewer than two
/// fields are malformed and skipped, mirroring the per-entry best-effort
/// contract of real parsers.
pub struct LineParser;

impl PayloadParser for LineParser {
    fn parse(&self, body: &[u8]) -> Vec<PushEntry> {
        let Ok(text) = std::str::from_utf8(body) else {
            return Vec::new();
        };

        text.lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let content_url = fields.next()?.to_string();
                let link = fields.next()?.to_string();
                Some(PushEntry {
                    content_url,
                    width: None,
                    height: None,
                    link,
                    raw: line.to_string(),
                })
            })
            .collect()
    }

    fn parser_name(&self) -> &'static str {
        "line"
    }
}

/// Register a listener that records delivered entries
pub fn recording_listener() -> (Listener, Arc<Mutex<Vec<PushEntry>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let listener: Listener = Arc::new(move |entry: &PushEntry| {
        sink.lock().unwrap().push(entry.clone());
    });
    (listener, seen)
}
