//! Contract Test: Store Fault Absorption
//!
//! A transient lease store fault must never turn into a policy decision:
//! the relay withholds the verdict (DenySilent) and attempts no state
//! mutation, so a flapping store can neither confirm a dead lease nor
//! evict a live one.
//!
//! If this test fails, infrastructure faults leak into subscription state.

mod common;

use common::*;
use hubrelay_core::{Relay, RelayEvent, Verdict};

const SUB: &str = "dGVzdC1zdWItMQ";

#[tokio::test]
async fn read_fault_withholds_verdict_and_mutates_nothing() {
    let store = FailingLeaseStore::new();
    let (relay, mut events) = Relay::new(
        Box::new(store.clone()),
        Box::new(LineParser),
        default_config(),
    )
    .expect("relay construction succeeds");

    let verdict = relay.evaluate_subscribe(SUB, at(100)).await;

    assert_eq!(verdict, Verdict::DenySilent);
    assert_eq!(
        store.mutation_count(),
        0,
        "a failed read must not be followed by writes or deletes"
    );
    assert_eq!(
        events.recv().await,
        Some(RelayEvent::SubscribeSkipped {
            subscription_id: SUB.to_string()
        })
    );
}

#[tokio::test]
async fn heartbeat_write_fault_propagates_without_event() {
    let store = FailingLeaseStore::new();
    let (relay, mut events) = Relay::new(
        Box::new(store.clone()),
        Box::new(LineParser),
        default_config(),
    )
    .expect("relay construction succeeds");

    let result = relay.record_heartbeat(SUB, at(100)).await;

    assert!(result.is_err(), "heartbeat failures surface to the caller");
    assert!(
        events.try_recv().is_err(),
        "no HeartbeatRecorded event for a failed write"
    );
}

#[tokio::test]
async fn unsubscribe_and_dispatch_survive_a_dead_store() {
    let (relay, _events) = Relay::new(
        Box::new(FailingLeaseStore::new()),
        Box::new(LineParser),
        default_config(),
    )
    .expect("relay construction succeeds");

    // Neither path consults the store
    assert_eq!(relay.evaluate_unsubscribe(SUB).await, Verdict::Confirm);

    let (listener, seen) = recording_listener();
    relay.on(SUB, listener).await;
    let deliveries = relay
        .handle_push(SUB, b"http://img/a http://page/a\n")
        .await;
    assert_eq!(deliveries, 1);
    assert_eq!(seen.lock().unwrap().len(), 1);
}
