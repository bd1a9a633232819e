//! Callback router behavior tests
//!
//! Drive the axum router end-to-end with the real core and the real
//! Flickr parser: challenge echoing, verdict-to-response mapping, and the
//! push path into registered listeners.

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use hubrelay_core::error::Result;
use hubrelay_core::store::MemoryLeaseStore;
use hubrelay_core::traits::{LeaseRecord, LeaseStore};
use hubrelay_core::{Relay, RelayConfig};
use hubrelay_http::callback_router;
use hubrelay_parser_flickr::FlickrAtomParser;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower::ServiceExt;

const SUB: &str = "dGVzdC1zdWItMQ";

const PUSH_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/">
  <entry>
    <id>tag:flickr.com,2005:/photo/5850270905</id>
    <author><uri>http://www.flickr.com/people/44124324682@N01/</uri></author>
    <media:content url="http://farm4.static.flickr.com/3065/5850270905_m.jpg" width="240" height="160"/>
  </entry>
</feed>"#;

fn relay_with_store(store: Box<dyn LeaseStore>) -> Arc<Relay> {
    let (relay, _events) = Relay::new(
        store,
        Box::new(FlickrAtomParser::new()),
        RelayConfig::default(),
    )
    .expect("relay construction succeeds");
    Arc::new(relay)
}

fn seeded_relay() -> Arc<Relay> {
    relay_with_store(Box::new(MemoryLeaseStore::new()))
}

async fn send(app: axum::Router, uri: &str, body: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

#[tokio::test]
async fn first_time_subscribe_echoes_the_challenge() {
    let app = callback_router(seeded_relay());

    let (status, body) = send(
        app,
        &format!("/?mode=subscribe&challenge=ch4ll3ng3&sub={SUB}"),
        "",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ch4ll3ng3");
}

#[tokio::test]
async fn live_renewal_echoes_and_stale_renewal_sends_empty_body() {
    let relay = seeded_relay();

    // Fresh heartbeat: renewal confirms
    relay.heartbeat(SUB).await.unwrap();
    let (status, body) = send(
        callback_router(relay.clone()),
        &format!("/?mode=subscribe&challenge=alive&sub={SUB}"),
        "",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "alive");

    // Age the lease past the 600 s threshold: renewal denies with an
    // empty body and evicts the record
    relay
        .record_heartbeat(SUB, Utc::now() - Duration::seconds(700))
        .await
        .unwrap();
    let (status, body) = send(
        callback_router(relay.clone()),
        &format!("/?mode=subscribe&challenge=alive&sub={SUB}"),
        "",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "", "denied verification must not echo the challenge");

    // The eviction reset the lifecycle: next verification is first-time
    let (status, body) = send(
        callback_router(relay),
        &format!("/?mode=subscribe&challenge=again&sub={SUB}"),
        "",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "again");
}

#[tokio::test]
async fn unsubscribe_always_echoes_the_challenge() {
    let app = callback_router(seeded_relay());

    let (status, body) = send(
        app,
        &format!("/?mode=unsubscribe&challenge=bye&sub={SUB}"),
        "",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "bye");
}

#[tokio::test]
async fn subscribe_without_challenge_confirms_with_empty_body() {
    let app = callback_router(seeded_relay());

    let (status, body) = send(app, &format!("/?mode=subscribe&sub={SUB}"), "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");
}

#[tokio::test]
async fn push_dispatches_to_listeners_and_answers_empty_200() {
    let relay = seeded_relay();
    let (_id, stream) = relay.watch(SUB).await;

    let (status, body) = send(
        callback_router(relay),
        &format!("/?sub={SUB}"),
        PUSH_BODY,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "", "push responses carry no payload");

    let entry = stream.take(1).collect::<Vec<_>>().await.remove(0);
    assert_eq!(
        entry.link,
        "http://www.flickr.com/photos/44124324682@N01/5850270905/"
    );
}

#[tokio::test]
async fn unrecognized_mode_is_treated_as_push() {
    let relay = seeded_relay();
    let (_id, stream) = relay.watch(SUB).await;

    let (status, _body) = send(
        callback_router(relay),
        &format!("/?mode=renew&sub={SUB}"),
        PUSH_BODY,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let entries: Vec<_> = stream.take(1).collect().await;
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn push_without_subscription_id_dispatches_nothing() {
    let relay = seeded_relay();
    let (_id, mut stream) = relay.watch(SUB).await;

    let (status, body) = send(callback_router(relay), "/", PUSH_BODY).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");
    assert!(
        tokio::time::timeout(std::time::Duration::from_millis(50), stream.next())
            .await
            .is_err(),
        "no entry may be delivered under an undefined id"
    );
}

#[tokio::test]
async fn malformed_push_body_is_absorbed() {
    let app = callback_router(seeded_relay());

    let (status, body) = send(app, &format!("/?sub={SUB}"), "not xml at all").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "", "parse failures are never surfaced to the hub");
}

/// Store whose reads fail, to drive the withheld-verdict path
struct FailingStore;

#[async_trait]
impl LeaseStore for FailingStore {
    async fn get(&self, _id: &str) -> Result<Option<LeaseRecord>> {
        Err(hubrelay_core::Error::lease_store("store unavailable"))
    }

    async fn set(&self, _id: &str, _record: LeaseRecord) -> Result<()> {
        Err(hubrelay_core::Error::lease_store("store unavailable"))
    }

    async fn delete(&self, _id: &str) -> Result<()> {
        Err(hubrelay_core::Error::lease_store("store unavailable"))
    }

    async fn delete_if_stale(&self, _id: &str, _cutoff: DateTime<Utc>) -> Result<bool> {
        Err(hubrelay_core::Error::lease_store("store unavailable"))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn store_fault_answers_503_not_a_denial() {
    let app = callback_router(relay_with_store(Box::new(FailingStore)));

    let (status, body) = send(
        app,
        &format!("/?mode=subscribe&challenge=ch&sub={SUB}"),
        "",
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "");
}
