//! Contract Test: Push Dispatch Pipeline
//!
//! Verifies the parse-then-fan-out path through the relay facade:
//!
//! - N listeners x M parsed entries -> exactly N x M invocations
//! - Every listener sees all entries in payload order
//! - Malformed entries shrink the batch without aborting it
//! - Listener registration is independent of lease state
//!
//! If this test fails, at-least-once in-process delivery is broken.

mod common;

use common::*;
use hubrelay_core::Relay;
use tokio_stream::StreamExt;

const SUB: &str = "dGVzdC1zdWItMQ";

fn relay() -> Relay {
    let (relay, _events) = Relay::new(
        Box::new(CountingLeaseStore::new()),
        Box::new(LineParser),
        default_config(),
    )
    .expect("relay construction succeeds");
    relay
}

#[tokio::test]
async fn every_listener_gets_every_entry_in_payload_order() {
    let relay = relay();

    let (l1, seen1) = recording_listener();
    let (l2, seen2) = recording_listener();
    relay.on(SUB, l1).await;
    relay.on(SUB, l2).await;

    let body = b"http://img/a http://page/a\nhttp://img/b http://page/b\n";
    let deliveries = relay.handle_push(SUB, body).await;

    // 2 listeners x 2 entries
    assert_eq!(deliveries, 4);
    for seen in [seen1, seen2] {
        let urls: Vec<String> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.content_url.clone())
            .collect();
        assert_eq!(urls, vec!["http://img/a", "http://img/b"]);
    }
}

#[tokio::test]
async fn malformed_entries_are_skipped_not_fatal() {
    let relay = relay();
    let (listener, seen) = recording_listener();
    relay.on(SUB, listener).await;

    // Middle line has no link field and cannot parse
    let body = b"http://img/a http://page/a\nmalformed-entry\nhttp://img/c http://page/c\n";
    let deliveries = relay.handle_push(SUB, body).await;

    assert_eq!(deliveries, 2, "two valid entries, one listener");
    let urls: Vec<String> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.content_url.clone())
        .collect();
    assert_eq!(
        urls,
        vec!["http://img/a", "http://img/c"],
        "valid entries keep their payload order"
    );
}

#[tokio::test]
async fn push_with_no_listeners_is_dropped_quietly() {
    let relay = relay();

    let deliveries = relay
        .handle_push(SUB, b"http://img/a http://page/a\n")
        .await;

    assert_eq!(deliveries, 0);
}

#[tokio::test]
async fn unparseable_body_dispatches_nothing() {
    let relay = relay();
    let (listener, seen) = recording_listener();
    relay.on(SUB, listener).await;

    let deliveries = relay.handle_push(SUB, &[0xff, 0xfe, 0x00]).await;

    assert_eq!(deliveries, 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn listeners_work_before_any_lease_exists() {
    let store = CountingLeaseStore::new();
    let (relay, _events) = Relay::new(
        Box::new(store.clone()),
        Box::new(LineParser),
        default_config(),
    )
    .expect("relay construction succeeds");

    // Register and push without ever recording a heartbeat
    let (_id, stream) = relay.watch(SUB).await;
    relay
        .handle_push(SUB, b"http://img/a http://page/a\n")
        .await;

    let entry = stream.take(1).collect::<Vec<_>>().await.remove(0);
    assert_eq!(entry.content_url, "http://img/a");
    assert_eq!(store.record(SUB).await, None, "dispatch never touches leases");
}

#[tokio::test]
async fn entries_are_scoped_to_their_subscription() {
    let relay = relay();
    let (l1, seen1) = recording_listener();
    let (l2, seen2) = recording_listener();
    relay.on(SUB, l1).await;
    relay.on("other-sub", l2).await;

    relay
        .handle_push(SUB, b"http://img/a http://page/a\n")
        .await;

    assert_eq!(seen1.lock().unwrap().len(), 1);
    assert!(seen2.lock().unwrap().is_empty());
}
