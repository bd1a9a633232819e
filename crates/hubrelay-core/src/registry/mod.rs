//! Plugin-based component registry
//!
//! The registry allows lease stores and payload parsers to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains in the
//! daemon.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hubrelay_core::ComponentRegistry;
//! use hubrelay_core::config::LeaseStoreConfig;
//!
//! let registry = ComponentRegistry::new();
//! registry.register_store("memory", Arc::new(MemoryLeaseStoreFactory));
//!
//! let config = LeaseStoreConfig::Memory;
//! let store = registry.create_store(&config).await?;
//! ```
//!
//! Implementations should register themselves during initialization; the
//! parser satellite crates expose a `register()` helper for this.

use crate::config::{LeaseStoreConfig, ParserConfig};
use crate::error::{Error, Result};
use crate::traits::{LeaseStore, LeaseStoreFactory, PayloadParser, PayloadParserFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry for plugin-based store and parser creation
///
/// Maintains maps of type names to factory objects, allowing dynamic
/// instantiation based on configuration.
///
/// ## Thread Safety
///
/// Uses interior mutability with RwLock, allowing concurrent reads and
/// exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered lease store factories
    stores: RwLock<HashMap<String, Arc<dyn LeaseStoreFactory>>>,

    /// Registered payload parser factories
    parsers: RwLock<HashMap<String, Arc<dyn PayloadParserFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lease store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Store type name (e.g., "memory", "file", "redis")
    /// - `factory`: Factory object for creating store instances
    pub fn register_store(&self, name: impl Into<String>, factory: Arc<dyn LeaseStoreFactory>) {
        let mut stores = self.stores.write().unwrap();
        stores.insert(name.into(), factory);
    }

    /// Register a payload parser factory
    ///
    /// # Parameters
    ///
    /// - `name`: Parser type name (e.g., "flickr")
    /// - `factory`: Factory object for creating parser instances
    pub fn register_parser(
        &self,
        name: impl Into<String>,
        factory: Arc<dyn PayloadParserFactory>,
    ) {
        let mut parsers = self.parsers.write().unwrap();
        parsers.insert(name.into(), factory);
    }

    /// Create a lease store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn LeaseStore>)`: Created store instance
    /// - `Err(Error)`: If the store type is not registered or creation fails
    pub async fn create_store(&self, config: &LeaseStoreConfig) -> Result<Box<dyn LeaseStore>> {
        let factory = {
            let stores = self.stores.read().unwrap();
            stores
                .get(config.type_name())
                .cloned()
                .ok_or_else(|| {
                    Error::config(format!("Unknown lease store type: {}", config.type_name()))
                })?
            // Lock released here, before the async create
        };

        let config_json = match config {
            LeaseStoreConfig::Custom { config, .. } => config.clone(),
            other => serde_json::to_value(other)?,
        };

        factory.create(&config_json).await
    }

    /// Create a payload parser from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn PayloadParser>)`: Created parser instance
    /// - `Err(Error)`: If the parser type is not registered or creation fails
    pub fn create_parser(&self, config: &ParserConfig) -> Result<Box<dyn PayloadParser>> {
        let parsers = self.parsers.read().unwrap();

        let factory = parsers.get(config.type_name()).ok_or_else(|| {
            Error::config(format!("Unknown parser type: {}", config.type_name()))
        })?;

        let config_json = match config {
            ParserConfig::Custom { config, .. } => config.clone(),
            other => serde_json::to_value(other)?,
        };

        factory.create(&config_json)
    }

    /// List all registered store types
    pub fn list_stores(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap();
        stores.keys().cloned().collect()
    }

    /// List all registered parser types
    pub fn list_parsers(&self) -> Vec<String> {
        let parsers = self.parsers.read().unwrap();
        parsers.keys().cloned().collect()
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap();
        stores.contains_key(name)
    }

    /// Check if a parser type is registered
    pub fn has_parser(&self, name: &str) -> bool {
        let parsers = self.parsers.read().unwrap();
        parsers.contains_key(name)
    }
}
