//! Core relay facade
//!
//! The Relay ties the pieces together for callers (the HTTP layer, the
//! daemon, embedders):
//!
//! - Answering hub verification requests via the LeasePolicy
//! - Recording application heartbeats
//! - Turning pushed bodies into entries via the PayloadParser
//! - Fanning entries out to listeners via the Dispatcher
//!
//! ## Event Flow
//!
//! ```text
//!  hub callback                     application
//!       │                                │
//!       ▼                                ▼
//! ┌──────────────┐  verdict      ┌─────────────┐
//! │ LeasePolicy  │◄──────────────│  heartbeat  │
//! └──────────────┘               └─────────────┘
//!       │ get/delete_if_stale          │ set
//!       ▼                              ▼
//! ┌─────────────────────────────────────────┐
//! │               LeaseStore                │
//! └─────────────────────────────────────────┘
//!
//!  push body ──► PayloadParser ──► Dispatcher ──► listeners
//! ```
//!
//! All operations are request-driven; the relay has no run loop. A bounded
//! event channel mirrors each decision for external monitoring.

use crate::config::RelayConfig;
use crate::dispatch::{Dispatcher, Listener, ListenerId};
use crate::error::Result;
use crate::lease::{LeasePolicy, Verdict};
use crate::traits::{LeaseStore, PayloadParser, PushEntry};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

/// Events emitted by the relay for external monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A subscribe/renewal verification was confirmed
    SubscribeConfirmed { subscription_id: String },

    /// A subscribe/renewal verification was denied (stale or invalid lease)
    SubscribeDenied { subscription_id: String },

    /// A subscribe/renewal verification could not be decided (store fault)
    SubscribeSkipped { subscription_id: String },

    /// An unsubscribe verification was confirmed
    UnsubscribeConfirmed { subscription_id: String },

    /// An application heartbeat refreshed a lease
    HeartbeatRecorded { subscription_id: String },

    /// A push payload was parsed and dispatched
    EntriesDispatched {
        subscription_id: String,
        /// Entries the parser extracted from the payload
        entries: usize,
        /// Listener invocations performed (listeners x entries)
        deliveries: usize,
    },
}

/// Core relay
///
/// ## Lifecycle
///
/// 1. Create with [`Relay::new()`], which also hands back the monitoring
///    event receiver
/// 2. Drive it from the transport: verification verdicts, heartbeats,
///    pushes
/// 3. Call [`Relay::flush()`] before shutdown so a persistent store writes
///    out pending state
///
/// ## Threading
///
/// All methods take `&self` and are safe to call from concurrent
/// request-handling tasks.
pub struct Relay {
    /// Lease policy answering hub verification requests
    policy: LeasePolicy,

    /// Store handle kept for shutdown flush
    store: Arc<dyn LeaseStore>,

    /// Parser for pushed content bodies
    parser: Box<dyn PayloadParser>,

    /// Listener registry and fan-out
    dispatcher: Dispatcher,

    /// Name of the callback query parameter carrying the subscription id
    subscription_param: String,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<RelayEvent>,
}

impl Relay {
    /// Create a new relay
    ///
    /// # Parameters
    ///
    /// - `store`: Lease store implementation
    /// - `parser`: Payload parser implementation
    /// - `config`: Relay configuration
    ///
    /// # Returns
    ///
    /// A tuple of (relay, event_receiver) where event_receiver yields
    /// monitoring events
    pub fn new(
        store: Box<dyn LeaseStore>,
        parser: Box<dyn PayloadParser>,
        config: RelayConfig,
    ) -> Result<(Self, mpsc::Receiver<RelayEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let store: Arc<dyn LeaseStore> = Arc::from(store);

        let relay = Self {
            policy: LeasePolicy::new(store.clone(), config.lease.threshold()),
            store,
            parser,
            dispatcher: Dispatcher::new(),
            subscription_param: config.subscription_param,
            event_tx: tx,
        };

        Ok((relay, rx))
    }

    /// Name of the callback query parameter carrying the subscription id
    pub fn subscription_param(&self) -> &str {
        &self.subscription_param
    }

    /// The lease policy
    pub fn policy(&self) -> &LeasePolicy {
        &self.policy
    }

    /// Evaluate a subscribe (or lease renewal) verification request
    pub async fn evaluate_subscribe(&self, subscription_id: &str, now: DateTime<Utc>) -> Verdict {
        let verdict = self.policy.evaluate_subscribe(subscription_id, now).await;

        self.emit_event(match verdict {
            Verdict::Confirm => RelayEvent::SubscribeConfirmed {
                subscription_id: subscription_id.to_string(),
            },
            Verdict::Deny => RelayEvent::SubscribeDenied {
                subscription_id: subscription_id.to_string(),
            },
            Verdict::DenySilent => RelayEvent::SubscribeSkipped {
                subscription_id: subscription_id.to_string(),
            },
        });
        verdict
    }

    /// Evaluate an unsubscribe verification request
    pub async fn evaluate_unsubscribe(&self, subscription_id: &str) -> Verdict {
        let verdict = self.policy.evaluate_unsubscribe(subscription_id).await;

        if verdict == Verdict::Confirm {
            self.emit_event(RelayEvent::UnsubscribeConfirmed {
                subscription_id: subscription_id.to_string(),
            });
        }
        verdict
    }

    /// Record an application heartbeat at the current time
    ///
    /// Called out-of-band by the owning application whenever it confirms
    /// the end user is still active.
    pub async fn heartbeat(&self, subscription_id: &str) -> Result<()> {
        self.record_heartbeat(subscription_id, Utc::now()).await
    }

    /// Record an application heartbeat at an explicit time
    pub async fn record_heartbeat(
        &self,
        subscription_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.policy.record_heartbeat(subscription_id, now).await?;
        self.emit_event(RelayEvent::HeartbeatRecorded {
            subscription_id: subscription_id.to_string(),
        });
        Ok(())
    }

    /// Parse a fully buffered push body and dispatch the entries
    ///
    /// The body must be complete; callers buffer the request body before
    /// handing it over. Entry-level parse failures shrink the batch and
    /// are never surfaced.
    ///
    /// # Returns
    ///
    /// The number of listener invocations performed
    pub async fn handle_push(&self, subscription_id: &str, body: &[u8]) -> usize {
        if subscription_id.is_empty() {
            warn!("Dropping push without a subscription id");
            return 0;
        }

        let entries = self.parser.parse(body);
        if entries.is_empty() {
            debug!(subscription_id, "Push body yielded no entries");
        }

        let deliveries = self.dispatcher.dispatch(subscription_id, &entries).await;

        self.emit_event(RelayEvent::EntriesDispatched {
            subscription_id: subscription_id.to_string(),
            entries: entries.len(),
            deliveries,
        });
        deliveries
    }

    /// Register a listener for a subscription id
    pub async fn on(&self, subscription_id: &str, listener: Listener) -> ListenerId {
        self.dispatcher.on(subscription_id, listener).await
    }

    /// Remove a previously registered listener
    pub async fn off(&self, subscription_id: &str, listener_id: ListenerId) -> bool {
        self.dispatcher.off(subscription_id, listener_id).await
    }

    /// Register a stream-backed listener for a subscription id
    pub async fn watch(
        &self,
        subscription_id: &str,
    ) -> (ListenerId, UnboundedReceiverStream<PushEntry>) {
        self.dispatcher.watch(subscription_id).await
    }

    /// Number of listeners currently registered for a subscription id
    pub async fn listener_count(&self, subscription_id: &str) -> usize {
        self.dispatcher.listener_count(subscription_id).await
    }

    /// Flush the lease store
    ///
    /// Call before shutdown so buffering stores persist pending changes.
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }

    /// Emit a monitoring event
    fn emit_event(&self, event: RelayEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                // Consumer is slower than event generation; dropping keeps
                // memory bounded.
                warn!(
                    "Relay event channel full, dropping event. Consider increasing \
                    event_channel_capacity or draining the receiver faster."
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Relay event receiver dropped, discarding event");
            }
        }
    }
}
