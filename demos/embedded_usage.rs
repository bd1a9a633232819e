//! Minimal embedding example for hubrelay-core
//!
//! This example demonstrates using hubrelay-core as a library in a custom
//! application, without the daemon or the HTTP layer: heartbeats, lease
//! verification verdicts, and consuming pushed entries through both a
//! callback listener and a watch stream.

use hubrelay_core::store::MemoryLeaseStore;
use hubrelay_core::{Listener, Relay, RelayConfig, Verdict};
use hubrelay_parser_flickr::FlickrAtomParser;
use std::sync::Arc;
use tokio_stream::StreamExt;

const SUB: &str = "ZGVtby1zdWI";

const PUSH_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/">
  <entry>
    <id>tag:flickr.com,2005:/photo/5850270905</id>
    <author><uri>http://www.flickr.com/people/44124324682@N01/</uri></author>
    <media:content url="http://farm4.static.flickr.com/3065/5850270905_m.jpg" width="240" height="160"/>
  </entry>
</feed>"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let (relay, mut events) = Relay::new(
        Box::new(MemoryLeaseStore::new()),
        Box::new(FlickrAtomParser::new()),
        RelayConfig::default(),
    )?;

    // A callback listener, invoked once per delivered entry
    let listener: Listener = Arc::new(|entry| {
        println!("[listener] {} ({:?}x{:?})", entry.content_url, entry.width, entry.height);
    });
    relay.on(SUB, listener).await;

    // A stream-backed consumer for the same subscription
    let (_watch_id, mut stream) = relay.watch(SUB).await;

    // The owning application confirms the user is active
    relay.heartbeat(SUB).await?;

    // The hub verifies the subscription; a live lease confirms
    let verdict = relay.evaluate_subscribe(SUB, chrono::Utc::now()).await;
    assert_eq!(verdict, Verdict::Confirm);
    println!("[verify] subscription confirmed");

    // The hub pushes content
    let deliveries = relay.handle_push(SUB, PUSH_BODY.as_bytes()).await;
    println!("[push] {deliveries} deliveries");

    if let Some(entry) = stream.next().await {
        println!("[stream] photo page: {}", entry.link);
    }

    // Monitoring events mirror every decision
    while let Ok(event) = events.try_recv() {
        println!("[event] {event:?}");
    }

    Ok(())
}
