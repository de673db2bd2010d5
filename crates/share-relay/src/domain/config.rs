//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings.
//! `main.rs` builds it from defaults, an optional TOML file and CLI/env
//! overrides; everything downstream receives the finished struct.
//!
//! Keeping configuration as a plain struct (no environment reads inside the
//! domain) lets tests construct exactly the relay they need.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use share_core::{BrokerPolicy, JoinPolicy};

/// Default allow-list location: the published identifier list.
pub const DEFAULT_ALLOW_LIST: &str =
    "https://raw.githubusercontent.com/Yacine2007/Alpha-AI-assistant/main/UUID%20QR%20code/UUID.txt";

/// Default port.  WebSocket upgrades and the HTTP API share it.
pub const DEFAULT_PORT: u16 = 10000;

/// All runtime configuration for the relay.
///
/// # Example
///
/// ```rust
/// use share_relay::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 10000);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the relay listens on, for both WebSocket upgrades and the
    /// HTTP API.
    pub bind_addr: SocketAddr,

    /// Where the allow-list is fetched from: an `http(s)://` URL or a local
    /// file path.
    pub allow_list: String,

    /// How long a fetched allow-list is trusted before it is fetched again.
    pub allow_list_ttl: Duration,

    /// Upper bound on a single allow-list fetch.  A slower fetch fails
    /// closed with `upstream_unavailable`.
    pub allow_list_timeout: Duration,

    /// Sessions with no activity for this long are evicted.  Also the grace
    /// window an idle session keeps its reservation for.
    pub idle_timeout: Duration,

    /// How often the sweeper scans for idle sessions.
    pub sweep_interval: Duration,

    /// WebSocket keepalive ping interval.
    pub ping_interval: Duration,

    /// Whether a `join` on an unreserved identifier reserves it.
    pub join_policy: JoinPolicy,

    /// Fallback `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for RelayConfig {
    /// | Field              | Default             |
    /// |--------------------|---------------------|
    /// | bind_addr          | `0.0.0.0:10000`     |
    /// | allow_list_ttl     | 30 seconds          |
    /// | allow_list_timeout | 5 seconds           |
    /// | idle_timeout       | 300 seconds         |
    /// | sweep_interval     | 300 seconds         |
    /// | ping_interval      | 30 seconds          |
    /// | join_policy        | `reserve-on-join`   |
    /// | log_level          | `info`              |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            allow_list: DEFAULT_ALLOW_LIST.to_string(),
            allow_list_ttl: Duration::from_secs(30),
            allow_list_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(300),
            ping_interval: Duration::from_secs(30),
            join_policy: JoinPolicy::ReserveOnJoin,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.allow_list.trim().is_empty() {
            return Err("allow_list must not be empty".to_string());
        }
        if self.allow_list_timeout.is_zero() {
            return Err("allow_list_timeout must be > 0".to_string());
        }
        if self.idle_timeout.is_zero() {
            return Err("idle_timeout must be > 0".to_string());
        }
        if self.sweep_interval.is_zero() {
            return Err("sweep_interval must be > 0".to_string());
        }
        if self.ping_interval.is_zero() {
            return Err("ping_interval must be > 0".to_string());
        }
        Ok(())
    }

    /// The broker-facing subset of the configuration.
    pub fn policy(&self) -> BrokerPolicy {
        BrokerPolicy {
            idle_timeout: self.idle_timeout,
            join_policy: self.join_policy,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
