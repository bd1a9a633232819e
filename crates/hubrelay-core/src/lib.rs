// # hubrelay-core
//
// Core library for the hubrelay push-notification relay.
//
// Hubrelay receives HTTP callbacks from a PubSubHubbub-style hub
// (subscribe / unsubscribe verification and content pushes), validates
// subscription liveness against last-seen heartbeats, parses pushed
// payloads, and republishes the parsed entries to in-process listeners
// keyed by an opaque subscription id.
//
// ## Architecture Overview
//
// - **LeaseStore**: Trait for persisting per-subscription last-seen times
// - **PayloadParser**: Trait for turning a pushed body into entries
// - **LeasePolicy**: Decides whether to confirm or deny hub verification
//   requests based on lease age
// - **Dispatcher**: Fans parsed entries out to registered listeners
// - **Relay**: Facade wiring policy, parser, and dispatcher together
// - **ComponentRegistry**: Plugin-based registry for stores and parsers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Policy and dispatch are separate from the
//    transport and from storage implementations
// 2. **Library-First**: All relay functionality is usable without the daemon
// 3. **Injected Dependencies**: The lease store and parser are passed in
//    explicitly, never reached through ambient globals
// 4. **Absorbed Failures**: Store faults and malformed payload entries never
//    escape to the hub-facing surface

pub mod config;
pub mod dispatch;
pub mod error;
pub mod lease;
pub mod registry;
pub mod relay;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{LeaseConfig, LeaseStoreConfig, ParserConfig, RelayConfig};
pub use dispatch::{Dispatcher, Listener, ListenerId};
pub use error::{Error, Result};
pub use lease::{LeasePolicy, Verdict};
pub use registry::ComponentRegistry;
pub use relay::{Relay, RelayEvent};
pub use store::{FileLeaseStore, MemoryLeaseStore};
pub use traits::{LeaseRecord, LeaseStore, PayloadParser, PushEntry};
