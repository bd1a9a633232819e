//! Core traits for the relay
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`LeaseStore`]: Persist per-subscription last-seen timestamps
//! - [`PayloadParser`]: Extract entries from a pushed content body

pub mod lease_store;
pub mod payload_parser;

pub use lease_store::{LeaseRecord, LeaseStore, LeaseStoreFactory};
pub use payload_parser::{PayloadParser, PayloadParserFactory, PushEntry};
