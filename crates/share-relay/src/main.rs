//! Alpha Share relay: entry point.
//!
//! This binary pairs a controlling endpoint with a controlled device that
//! share an identifier from the published allow-list, then forwards opaque
//! commands between them over WebSocket.
//!
//! # Usage
//!
//! ```text
//! share-relay [OPTIONS]
//!
//! Options:
//!   --config <FILE>              Optional TOML configuration file
//!   --bind <IP>                  Listen address [default: 0.0.0.0]
//!   --port <PORT>                WebSocket and HTTP API port [default: 10000]
//!   --allow-list <URL|PATH>      Allow-list location
//!   --allow-list-ttl <SECS>      Allow-list cache lifetime [default: 30]
//!   --allow-list-timeout <SECS>  Allow-list fetch timeout [default: 5]
//!   --idle-timeout <SECS>        Idle session eviction threshold [default: 300]
//!   --sweep-interval <SECS>      Idle sweep period [default: 300]
//!   --ping-interval <SECS>       WebSocket keepalive period [default: 30]
//!   --join-policy <POLICY>       reserve-on-join | require-reservation
//!   --log-level <FILTER>         Fallback log filter when RUST_LOG is unset
//! ```
//!
//! # Precedence
//!
//! CLI flag, then its `SHARE_*` environment variable, then the TOML file,
//! then the built-in default.  `PORT` is honoured as a last-resort port for
//! hosting platforms that inject it.
//!
//! # Architecture overview
//!
//! ```text
//! Endpoints  (JSON over WebSocket)          Operators  (HTTP)
//!       ↕                                        ↕
//!       └──────────── one port ──────────────────┘
//! share-relay  ← this process
//!   domain/          RelayConfig
//!   application/     Broker, allow-list validator, relay router
//!   infrastructure/
//!     ws_server      Listener, WebSocket upgrades, per-connection tasks
//!     hub            Per-connection outbound queues
//!     http_api       /health, /identifiers, /register, /unregister
//!     sweeper        Idle-session eviction
//!       ↕
//! Allow-list  (HTTP(S) URL or local file)
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use share_core::JoinPolicy;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use share_relay::application::allow_list::{self, AllowListValidator};
use share_relay::application::Broker;
use share_relay::domain::RelayConfig;
use share_relay::infrastructure::{
    load_config_file, run_server, source_from_location, spawn_sweeper, ConnectionHub, FileConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Alpha Share pairing relay.
///
/// Every value is optional so that unset flags fall through to the TOML
/// file and then to the built-in defaults.
#[derive(Debug, Default, Parser)]
#[command(
    name = "share-relay",
    about = "WebSocket pairing relay and session broker for Alpha Share",
    version
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "SHARE_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to listen on.
    #[arg(long, env = "SHARE_BIND")]
    bind: Option<String>,

    /// TCP port for WebSocket upgrades and the HTTP API.
    #[arg(long, env = "SHARE_PORT")]
    port: Option<u16>,

    /// Port injected by hosting platforms.  Used only when no port is
    /// configured anywhere else.
    #[arg(long = "platform-port", env = "PORT", hide = true)]
    platform_port: Option<u16>,

    /// Allow-list location: an `http(s)://` URL or a local file path.
    #[arg(long, env = "SHARE_ALLOW_LIST")]
    allow_list: Option<String>,

    /// Seconds a fetched allow-list is trusted.
    #[arg(long, env = "SHARE_ALLOW_LIST_TTL")]
    allow_list_ttl: Option<u64>,

    /// Seconds before an allow-list fetch is abandoned.
    #[arg(long, env = "SHARE_ALLOW_LIST_TIMEOUT")]
    allow_list_timeout: Option<u64>,

    /// Seconds of inactivity before a session is evicted.
    #[arg(long, env = "SHARE_IDLE_TIMEOUT")]
    idle_timeout: Option<u64>,

    /// Seconds between idle sweeps.
    #[arg(long, env = "SHARE_SWEEP_INTERVAL")]
    sweep_interval: Option<u64>,

    /// Seconds between WebSocket keepalive pings.
    #[arg(long, env = "SHARE_PING_INTERVAL")]
    ping_interval: Option<u64>,

    /// `reserve-on-join` or `require-reservation`.
    #[arg(long, env = "SHARE_JOIN_POLICY")]
    join_policy: Option<JoinPolicy>,

    /// Fallback log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "SHARE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Merges the CLI arguments over `file` and the built-in defaults, then
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a bind address is not a valid IP address or the
    /// merged configuration fails [`RelayConfig::validate`].
    fn into_relay_config(self, file: FileConfig) -> anyhow::Result<RelayConfig> {
        let defaults = RelayConfig::default();
        let secs = |cli: Option<u64>, file: Option<u64>, default: Duration| {
            cli.or(file).map(Duration::from_secs).unwrap_or(default)
        };

        let port = self
            .port
            .or(file.server.port)
            .or(self.platform_port)
            .unwrap_or(defaults.bind_addr.port());
        let bind_addr = bind_addr(
            self.bind.or(file.server.bind),
            port,
            defaults.bind_addr,
        )
        .context("invalid bind address")?;

        let config = RelayConfig {
            bind_addr,
            allow_list: self
                .allow_list
                .or(file.allow_list.location)
                .unwrap_or(defaults.allow_list),
            allow_list_ttl: secs(
                self.allow_list_ttl,
                file.allow_list.ttl_secs,
                defaults.allow_list_ttl,
            ),
            allow_list_timeout: secs(
                self.allow_list_timeout,
                file.allow_list.timeout_secs,
                defaults.allow_list_timeout,
            ),
            idle_timeout: secs(
                self.idle_timeout,
                file.sessions.idle_timeout_secs,
                defaults.idle_timeout,
            ),
            sweep_interval: secs(
                self.sweep_interval,
                file.sessions.sweep_interval_secs,
                defaults.sweep_interval,
            ),
            ping_interval: secs(
                self.ping_interval,
                file.server.ping_interval_secs,
                defaults.ping_interval,
            ),
            join_policy: self
                .join_policy
                .or(file.sessions.join_policy)
                .unwrap_or(defaults.join_policy),
            log_level: self
                .log_level
                .or(file.server.log_level)
                .unwrap_or(defaults.log_level),
        };

        config
            .validate()
            .map_err(|msg| anyhow::anyhow!("invalid configuration: {msg}"))?;
        Ok(config)
    }
}

/// Combines an optional IP string with `port`, keeping `default`'s IP when
/// none is given.
fn bind_addr(ip: Option<String>, port: u16, default: SocketAddr) -> anyhow::Result<SocketAddr> {
    let ip = match ip {
        Some(raw) => raw
            .trim()
            .parse::<IpAddr>()
            .with_context(|| format!("'{raw}' is not an IP address"))?,
        None => default.ip(),
    };
    Ok(SocketAddr::new(ip, port))
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and merged with the optional TOML file into a
///    [`RelayConfig`].
/// 2. `tracing_subscriber` is initialised.  `RUST_LOG` wins over the
///    configured log level.
/// 3. The allow-list source is built and warmed up.  A failed warm-up is
///    logged; requests retry the fetch on demand.
/// 4. The hub, broker, Ctrl+C handler and idle sweeper are started.
/// 5. [`run_server`] binds the single listener and serves the HTTP API and
///    WebSocket upgrades until the shutdown flag is cleared.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => load_config_file(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => FileConfig::default(),
    };
    let config = cli.into_relay_config(file)?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Alpha Share relay starting: listen={}, join_policy={}",
        config.bind_addr, config.join_policy
    );

    // ── Allow-list ────────────────────────────────────────────────────────────
    let source = source_from_location(&config.allow_list, config.allow_list_timeout)
        .context("failed to set up allow-list source")?;
    let validator = AllowListValidator::new(
        source,
        config.allow_list_ttl,
        config.allow_list_timeout,
    );
    allow_list::warm_up(&validator).await;

    // ── Broker ────────────────────────────────────────────────────────────────
    let hub = Arc::new(ConnectionHub::new());
    let broker = Arc::new(Broker::new(validator, hub.clone(), config.policy()));

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let sweeper = spawn_sweeper(
        Arc::clone(&broker),
        config.sweep_interval,
        Arc::clone(&running),
    );

    // ── Main server loop ──────────────────────────────────────────────────────
    let result = run_server(config, broker, hub, Arc::clone(&running)).await;

    // The listener may have failed to bind; stop the sweeper either way.
    running.store(false, Ordering::Relaxed);
    if let Err(e) = sweeper.await {
        error!("sweeper task panicked: {e}");
    }

    result?;
    info!("Alpha Share relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
