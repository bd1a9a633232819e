//! Configuration types for the relay
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Name of the callback query parameter carrying the subscription id
    #[serde(default = "default_subscription_param")]
    pub subscription_param: String,

    /// Lease policy settings
    #[serde(default)]
    pub lease: LeaseConfig,

    /// Lease store configuration
    #[serde(default)]
    pub store: LeaseStoreConfig,

    /// Payload parser configuration
    #[serde(default)]
    pub parser: ParserConfig,

    /// Capacity of the internal monitoring-event channel
    ///
    /// When full, new relay events are dropped (with a warning log).
    /// This prevents unbounded memory growth when no consumer keeps up.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl RelayConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            subscription_param: default_subscription_param(),
            lease: LeaseConfig::default(),
            store: LeaseStoreConfig::default(),
            parser: ParserConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.subscription_param.is_empty() {
            return Err(crate::Error::config(
                "Subscription id parameter name cannot be empty",
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "Event channel capacity must be > 0",
            ));
        }

        self.lease.validate()?;
        self.store.validate()?;
        self.parser.validate()?;

        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Lease policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Maximum allowed gap since the last heartbeat before a lease is
    /// considered stale (in seconds)
    ///
    /// A renewal request arriving exactly at the threshold still counts as
    /// alive (the comparison is inclusive).
    #[serde(default = "default_threshold_secs")]
    pub threshold_secs: u64,
}

impl LeaseConfig {
    /// Validate the lease configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.threshold_secs == 0 {
            return Err(crate::Error::config("Lease threshold must be > 0"));
        }
        Ok(())
    }

    /// The threshold as a chrono duration
    pub fn threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.threshold_secs as i64)
    }
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            threshold_secs: default_threshold_secs(),
        }
    }
}

/// Lease store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeaseStoreConfig {
    /// File-based lease store
    File {
        /// Path to the lease state file
        path: String,
    },

    /// In-memory lease store (not persistent)
    #[default]
    Memory,

    /// Custom lease store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl LeaseStoreConfig {
    /// Validate the lease store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            LeaseStoreConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("Lease store path cannot be empty"));
                }
                Ok(())
            }
            LeaseStoreConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom lease store factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom lease store config cannot be null",
                    ));
                }
                Ok(())
            }
            LeaseStoreConfig::Memory => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            LeaseStoreConfig::File { .. } => "file",
            LeaseStoreConfig::Memory => "memory",
            LeaseStoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Payload parser configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParserConfig {
    /// Flickr Atom feed parser
    #[default]
    Flickr,

    /// Custom payload parser
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ParserConfig {
    /// Validate the parser configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ParserConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom parser factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom parser config cannot be null"));
                }
                Ok(())
            }
            ParserConfig::Flickr => Ok(()),
        }
    }

    /// Get the parser type name
    pub fn type_name(&self) -> &str {
        match self {
            ParserConfig::Flickr => "flickr",
            ParserConfig::Custom { factory, .. } => factory,
        }
    }
}

fn default_subscription_param() -> String {
    "sub".to_string()
}

fn default_threshold_secs() -> u64 {
    600
}

fn default_event_channel_capacity() -> usize {
    1000
}
