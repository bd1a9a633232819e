//! Subscription lease policy
//!
//! The hub periodically calls back to verify that a subscription should
//! stay alive. The policy answers those requests from the lease store:
//!
//! - No record: first-time subscription, confirm. The owning application
//!   is expected to have created its own bookkeeping before the hub calls
//!   back; the store record itself appears with the first heartbeat.
//! - Record within the liveness threshold: renewal for an active
//!   subscriber, confirm.
//! - Record older than the threshold: the subscriber went quiet, deny and
//!   evict the record.
//! - Store read fault: deny silently, mutate nothing. A transient
//!   infrastructure fault must neither confirm a possibly-dead lease nor
//!   evict a possibly-live one.
//!
//! The per-subscription state machine is implicit in record presence and
//! age: ABSENT -> (heartbeat) -> ACTIVE -> (quiet past threshold) ->
//! STALE -> (denied renewal) -> ABSENT.

use crate::error::Result;
use crate::traits::{LeaseRecord, LeaseStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of evaluating a hub verification request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Echo the challenge; the subscription is (or becomes) active
    Confirm,

    /// Do not echo the challenge; the lease was stale or the id invalid
    Deny,

    /// Do not echo the challenge, and treat the request as unanswered:
    /// the store faulted and no policy decision was possible
    DenySilent,
}

/// Lease policy engine
///
/// Decides subscribe/unsubscribe verdicts from lease age and records
/// application heartbeats. The store is injected so tests and embedders
/// can supply their own.
///
/// `evaluate_unsubscribe` always confirms in the base policy; deployments
/// that require proof of ownership can wrap or replace the policy at the
/// call site.
pub struct LeasePolicy {
    store: Arc<dyn LeaseStore>,
    threshold: chrono::Duration,
}

impl LeasePolicy {
    /// Create a policy over the given store and liveness threshold
    pub fn new(store: Arc<dyn LeaseStore>, threshold: chrono::Duration) -> Self {
        Self { store, threshold }
    }

    /// The configured liveness threshold
    pub fn threshold(&self) -> chrono::Duration {
        self.threshold
    }

    /// Evaluate a subscribe (or lease renewal) verification request
    ///
    /// A gap exactly equal to the threshold still confirms; only a
    /// strictly larger gap denies. Stale leases are evicted through the
    /// store's conditional delete, so a heartbeat racing this call cannot
    /// be thrown away.
    pub async fn evaluate_subscribe(&self, subscription_id: &str, now: DateTime<Utc>) -> Verdict {
        if subscription_id.is_empty() {
            warn!("Subscribe verification without a subscription id, denying");
            return Verdict::Deny;
        }

        let record = match self.store.get(subscription_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    subscription_id,
                    error = %e,
                    "Lease store read failed, withholding verdict"
                );
                return Verdict::DenySilent;
            }
        };

        match record {
            None => {
                debug!(subscription_id, "No lease on file, confirming first-time subscription");
                Verdict::Confirm
            }
            Some(record) if !record.is_stale(self.threshold, now) => {
                debug!(subscription_id, "Lease alive, confirming renewal");
                Verdict::Confirm
            }
            Some(record) => {
                let cutoff = now - self.threshold;
                match self.store.delete_if_stale(subscription_id, cutoff).await {
                    Ok(true) => {
                        info!(
                            subscription_id,
                            last_seen = %record.last_seen,
                            "Lease stale, denied renewal and evicted record"
                        );
                    }
                    Ok(false) => {
                        // A heartbeat revived the lease after our read; the
                        // record stays and the hub re-verifies next cycle.
                        debug!(subscription_id, "Lease refreshed concurrently, record kept");
                    }
                    Err(e) => {
                        warn!(subscription_id, error = %e, "Failed to evict stale lease");
                    }
                }
                Verdict::Deny
            }
        }
    }

    /// Evaluate an unsubscribe verification request
    ///
    /// Always confirms: the base policy takes the hub at its word.
    pub async fn evaluate_unsubscribe(&self, _subscription_id: &str) -> Verdict {
        Verdict::Confirm
    }

    /// Record an application heartbeat for a subscription
    ///
    /// Unconditionally overwrites the record's `last_seen`, creating the
    /// record if none exists. Repeated calls with non-decreasing
    /// timestamps simply advance the stored time.
    pub async fn record_heartbeat(
        &self,
        subscription_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if subscription_id.is_empty() {
            return Err(crate::Error::invalid_input(
                "Cannot record a heartbeat without a subscription id",
            ));
        }

        debug!(subscription_id, at = %now, "Recording heartbeat");
        self.store.set(subscription_id, LeaseRecord::new(now)).await
    }
}
