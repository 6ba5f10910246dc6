//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

use backend::domain::{GroupOrderConfig, RateLimitConfig};
use backend::inbound::ws::OriginPolicy;

/// Environment variable overriding the listen address.
pub const BIND_ADDR_ENV: &str = "BIND_ADDR";

/// Environment variable overriding the expiry sweep interval in seconds.
pub const SWEEP_INTERVAL_SECS_ENV: &str = "SESSION_SWEEP_INTERVAL_SECS";

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) group_order: GroupOrderConfig,
    pub(crate) rate_limit: RateLimitConfig,
    pub(crate) origins: OriginPolicy,
    pub(crate) sweep_interval: Duration,
}

impl ServerConfig {
    /// Load the full configuration from the process environment.
    pub fn from_env() -> Self {
        let bind_addr = std::env::var(BIND_ADDR_ENV)
            .ok()
            .and_then(|raw| match raw.parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(error) => {
                    warn!(value = raw, error = %error, "ignoring malformed BIND_ADDR");
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_BIND_ADDR));

        let sweep_interval = std::env::var(SWEEP_INTERVAL_SECS_ENV)
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs.max(1)))
            .unwrap_or(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));

        Self {
            bind_addr,
            group_order: GroupOrderConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            origins: OriginPolicy::from_env(),
            sweep_interval,
        }
    }

    /// Override the bind address (used by integration fixtures).
    #[must_use]
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
