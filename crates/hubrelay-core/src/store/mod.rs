// # Lease Store Implementations
//
// This module provides implementations of the LeaseStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::{FileLeaseStore, FileLeaseStoreFactory};
pub use memory::{MemoryLeaseStore, MemoryLeaseStoreFactory};
