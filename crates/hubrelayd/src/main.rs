// # hubrelayd - Relay Daemon
//
// Thin integration layer over hubrelay-core: reads configuration from
// environment variables, wires the components together through the
// registry, and serves the hub callback endpoint. All relay logic lives
// in hubrelay-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Server
// - `HUBRELAY_LISTEN_ADDR`: Socket address to listen on (default 0.0.0.0:8080)
// - `HUBRELAY_SUB_PARAM`: Callback query parameter carrying the
//   subscription id (default "sub")
//
// ### Lease Policy
// - `HUBRELAY_LEASE_THRESHOLD_SECS`: Liveness window in seconds (default 600)
//
// ### Lease Store
// - `HUBRELAY_LEASE_STORE_TYPE`: Type of lease store (memory, file)
// - `HUBRELAY_LEASE_STORE_PATH`: Path to lease file (for file store)
//
// ### Parser
// - `HUBRELAY_PARSER_TYPE`: Payload parser type (flickr)
//
// ### Logging
// - `HUBRELAY_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export HUBRELAY_LISTEN_ADDR=0.0.0.0:8080
// export HUBRELAY_LEASE_STORE_TYPE=file
// export HUBRELAY_LEASE_STORE_PATH=/var/lib/hubrelay/leases.json
//
// hubrelayd
// ```

use anyhow::Result;
use hubrelay_core::store::{FileLeaseStoreFactory, MemoryLeaseStoreFactory};
use hubrelay_core::{
    ComponentRegistry, LeaseConfig, LeaseStoreConfig, ParserConfig, Relay, RelayConfig, RelayEvent,
};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum RelayExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<RelayExitCode> for ExitCode {
    fn from(code: RelayExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    listen_addr: String,
    subscription_param: String,
    lease_threshold_secs: u64,
    store_type: String,
    store_path: Option<String>,
    parser_type: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            listen_addr: env::var("HUBRELAY_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            subscription_param: env::var("HUBRELAY_SUB_PARAM")
                .unwrap_or_else(|_| "sub".to_string()),
            lease_threshold_secs: match env::var("HUBRELAY_LEASE_THRESHOLD_SECS") {
                Ok(raw) => raw.parse().map_err(|_| {
                    anyhow::anyhow!(
                        "HUBRELAY_LEASE_THRESHOLD_SECS must be an integer number of seconds. \
                        Got: {raw}"
                    )
                })?,
                Err(_) => 600,
            },
            store_type: env::var("HUBRELAY_LEASE_STORE_TYPE")
                .unwrap_or_else(|_| "memory".to_string()),
            store_path: env::var("HUBRELAY_LEASE_STORE_PATH").ok(),
            parser_type: env::var("HUBRELAY_PARSER_TYPE").unwrap_or_else(|_| "flickr".to_string()),
            log_level: env::var("HUBRELAY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks field formats, type enumerations, and numeric ranges so a
    /// misconfigured daemon fails at startup with an actionable message
    /// instead of misbehaving later.
    fn validate(&self) -> Result<()> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!(
                "HUBRELAY_LISTEN_ADDR is not a valid socket address. \
                Expected host:port, e.g. 0.0.0.0:8080. Got: {}",
                self.listen_addr
            );
        }

        if self.subscription_param.is_empty() {
            anyhow::bail!("HUBRELAY_SUB_PARAM cannot be empty");
        }
        if self
            .subscription_param
            .chars()
            .any(|c| c == '=' || c == '&' || c == '?')
        {
            anyhow::bail!(
                "HUBRELAY_SUB_PARAM must be a plain query parameter name. Got: {}",
                self.subscription_param
            );
        }

        // A week-long lease window is already generous; anything larger is
        // almost certainly a unit mistake.
        if !(1..=604_800).contains(&self.lease_threshold_secs) {
            anyhow::bail!(
                "HUBRELAY_LEASE_THRESHOLD_SECS must be between 1 and 604800 seconds. Got: {}",
                self.lease_threshold_secs
            );
        }

        match self.store_type.as_str() {
            "memory" | "file" => {}
            _ => anyhow::bail!(
                "HUBRELAY_LEASE_STORE_TYPE '{}' is not supported. \
                Supported types: memory, file",
                self.store_type
            ),
        }

        if self.store_type == "file" {
            match self.store_path.as_deref() {
                None | Some("") => anyhow::bail!(
                    "HUBRELAY_LEASE_STORE_PATH is required when HUBRELAY_LEASE_STORE_TYPE=file. \
                    Set it via: export HUBRELAY_LEASE_STORE_PATH=/var/lib/hubrelay/leases.json"
                ),
                Some(path) => {
                    if let Some(parent) = std::path::Path::new(path).parent()
                        && !parent.as_os_str().is_empty()
                        && !parent.exists()
                    {
                        anyhow::bail!(
                            "HUBRELAY_LEASE_STORE_PATH parent directory does not exist: {}. \
                            Create it first: sudo mkdir -p {}",
                            parent.display(),
                            parent.display()
                        );
                    }
                }
            }
        }

        match self.parser_type.as_str() {
            "flickr" => {}
            _ => anyhow::bail!(
                "HUBRELAY_PARSER_TYPE '{}' is not supported. Supported parsers: flickr",
                self.parser_type
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "HUBRELAY_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// The core relay configuration derived from the environment
    fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            subscription_param: self.subscription_param.clone(),
            lease: LeaseConfig {
                threshold_secs: self.lease_threshold_secs,
            },
            store: match self.store_type.as_str() {
                "file" => LeaseStoreConfig::File {
                    path: self.store_path.clone().unwrap_or_default(),
                },
                _ => LeaseStoreConfig::Memory,
            },
            parser: ParserConfig::Flickr,
            ..RelayConfig::default()
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return RelayExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return RelayExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RelayExitCode::ConfigError.into();
    }

    info!("Starting hubrelayd daemon");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RelayExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            RelayExitCode::RuntimeError
        } else {
            RelayExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    // Register built-in components
    let registry = ComponentRegistry::new();
    registry.register_store("memory", Arc::new(MemoryLeaseStoreFactory));
    registry.register_store("file", Arc::new(FileLeaseStoreFactory));

    #[cfg(feature = "flickr")]
    {
        info!("Registering Flickr payload parser");
        hubrelay_parser_flickr::register(&registry);
    }

    let relay_config = config.relay_config();

    // Create components from config
    let store = registry.create_store(&relay_config.store).await?;
    let parser = registry.create_parser(&relay_config.parser)?;

    info!(
        "Lease store: {}, parser: {}, threshold: {}s",
        relay_config.store.type_name(),
        relay_config.parser.type_name(),
        relay_config.lease.threshold_secs
    );

    let (relay, events) = Relay::new(store, parser, relay_config)?;
    let relay = Arc::new(relay);

    // Mirror relay decisions into the log
    tokio::spawn(drain_events(events));

    let app = hubrelay_http::callback_router(relay.clone());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal()?)
        .await?;

    // Flush state before exiting
    relay.flush().await?;
    info!("Lease store flushed, daemon stopped");

    Ok(())
}

/// Log relay monitoring events
async fn drain_events(mut events: tokio::sync::mpsc::Receiver<RelayEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            RelayEvent::SubscribeConfirmed { subscription_id } => {
                info!(subscription_id, "Subscription verification confirmed");
            }
            RelayEvent::SubscribeDenied { subscription_id } => {
                info!(subscription_id, "Subscription verification denied");
            }
            RelayEvent::SubscribeSkipped { subscription_id } => {
                warn!(subscription_id, "Subscription verification skipped (store fault)");
            }
            RelayEvent::UnsubscribeConfirmed { subscription_id } => {
                info!(subscription_id, "Unsubscribe verification confirmed");
            }
            RelayEvent::HeartbeatRecorded { subscription_id } => {
                debug!(subscription_id, "Heartbeat recorded");
            }
            RelayEvent::EntriesDispatched {
                subscription_id,
                entries,
                deliveries,
            } => {
                debug!(subscription_id, entries, deliveries, "Push dispatched");
            }
        }
    }
}

/// Build a future resolving on SIGTERM or SIGINT
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down"),
        }
    })
}

/// Build a future resolving on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        } else {
            info!("Received CTRL-C, shutting down");
        }
    })
}
