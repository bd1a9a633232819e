//! Hub-facing HTTP callback router
//!
//! A thin integration layer over [`hubrelay_core::Relay`]: one
//! method-agnostic route that demultiplexes hub callbacks by the `mode`
//! query parameter.
//!
//! - `mode=subscribe` / `mode=unsubscribe`: ask the relay for a verdict
//!   and echo the `challenge` parameter only on Confirm
//! - anything else: a content push; the body is fully buffered before the
//!   relay parses it, and the hub always gets an empty 200 regardless of
//!   how many entries survived parsing
//!
//! No business logic lives here. Lease decisions, parsing, and fan-out
//! are all owned by the core.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use chrono::Utc;
use hubrelay_core::{Relay, Verdict};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Shared state for the callback handler
#[derive(Clone)]
pub struct CallbackState {
    relay: Arc<Relay>,
}

impl CallbackState {
    /// Create a new callback state
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }

    /// Get a reference to the relay
    pub fn relay(&self) -> &Relay {
        &self.relay
    }
}

/// Creates the hub callback router
///
/// The hub calls a single path with varying methods, so the route accepts
/// any method at `/`.
pub fn callback_router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/", any(callback_handler))
        .with_state(CallbackState::new(relay))
}

/// Demultiplex one hub callback
async fn callback_handler(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let relay = state.relay();

    let subscription_id = params
        .get(relay.subscription_param())
        .map(String::as_str)
        .unwrap_or("");
    let challenge = params.get("challenge").map(String::as_str).unwrap_or("");

    match params.get("mode").map(String::as_str) {
        Some("subscribe") => {
            let verdict = relay.evaluate_subscribe(subscription_id, Utc::now()).await;
            verification_response(verdict, challenge)
        }
        Some("unsubscribe") => {
            let verdict = relay.evaluate_unsubscribe(subscription_id).await;
            verification_response(verdict, challenge)
        }
        // Absent or unrecognized mode means a content push. The Bytes
        // extractor has already buffered the full body; a connection that
        // died mid-body never reaches this handler.
        _ => {
            let deliveries = relay.handle_push(subscription_id, &body).await;
            debug!(subscription_id, deliveries, "Processed content push");
            StatusCode::OK.into_response()
        }
    }
}

/// Map a verification verdict onto the hub-facing response
///
/// The hub reads the body, not the status: a confirmed verification
/// echoes the challenge, a denied one sends an empty 200. A withheld
/// verdict (store fault) answers 503 so the hub retries later instead of
/// reading the empty body as a denial.
fn verification_response(verdict: Verdict, challenge: &str) -> Response {
    match verdict {
        Verdict::Confirm => (StatusCode::OK, challenge.to_string()).into_response(),
        Verdict::Deny => StatusCode::OK.into_response(),
        Verdict::DenySilent => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
