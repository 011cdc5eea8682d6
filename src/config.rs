//! Configuration for rackwire
//!
//! Centralized configuration with sensible defaults.

use std::sync::Arc;
use std::time::Duration;

use crate::protocol::FieldLayout;

/// Main configuration for a controller session
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Controller address (host:port)
    pub addr: String,

    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// How long a request waits for its full status frame (milliseconds)
    pub response_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// Disable Nagle's algorithm
    pub nodelay: bool,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Drop bytes already waiting on the socket before each command
    /// (late answers to timed-out requests)
    pub discard_stale_input: bool,

    /// Status word layout. Confirm against the controller documentation.
    pub layout: Arc<FieldLayout>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "1.1.1.2:2000".to_string(),
            connect_timeout_ms: 10_000,
            response_timeout_ms: 5_000,
            write_timeout_ms: 5_000,
            nodelay: true,
            discard_stale_input: true,
            layout: Arc::new(FieldLayout::stow()),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the controller address (host:port)
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.config.addr = addr.into();
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the response timeout (in milliseconds)
    pub fn response_timeout_ms(mut self, ms: u64) -> Self {
        self.config.response_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Enable or disable stale input draining before each command
    pub fn discard_stale_input(mut self, discard: bool) -> Self {
        self.config.discard_stale_input = discard;
        self
    }

    /// Set the status word layout
    pub fn layout(mut self, layout: FieldLayout) -> Self {
        self.config.layout = Arc::new(layout);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
