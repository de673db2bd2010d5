//! Relay server: the single listener and the per-connection task.
//!
//! This module is responsible for:
//!
//! 1. Binding one TCP listener on the configured address.  The HTTP API and
//!    WebSocket upgrades share it, so hosting platforms that expose a single
//!    `PORT` reach both.
//! 2. Upgrading requests on `/` and `/ws` that ask for a WebSocket, and
//!    registering each connection with the [`ConnectionHub`] under a fresh
//!    [`ConnectionId`].
//! 3. Running one `select!` loop per connection over:
//!    - inbound frames (decoded and handed to the broker in arrival order),
//!    - the connection's outbound queue (relayed commands, peer events),
//!    - its close signal (unregister, idle eviction, shutdown),
//!    - a keepalive ping tick.
//! 4. Releasing the connection's binding exactly once when the loop ends,
//!    whether the peer closed cleanly or the socket simply died.
//!
//! # Scalability
//!
//! Each connection runs in its own Tokio task and only ever blocks on its
//! own socket.  The broker calls it makes are non-blocking apart from the
//! allow-list check, which is bounded by the fetch timeout.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use share_core::{ClientMsg, ConnectionId, ServerMsg};
use tokio::net::TcpListener;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::broker::Broker;
use crate::application::session_handler::handle_client_msg;
use crate::application::transport::CloseReason;
use crate::domain::config::RelayConfig;
use crate::infrastructure::http_api::{self, ApiState};
use crate::infrastructure::hub::{ConnectionChannels, ConnectionHub};

type WsSink = SplitSink<WebSocket, WsMessage>;
type WsRecv = SplitStream<WebSocket>;

/// How often the server checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves the HTTP API and WebSocket
/// connections until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound or the server fails
/// while running.
pub async fn run_server(
    config: RelayConfig,
    broker: Arc<Broker>,
    hub: Arc<ConnectionHub>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind relay listener on {}", config.bind_addr))?;

    info!(
        "relay listening on {} (HTTP API and WebSocket)",
        config.bind_addr
    );

    serve(listener, config.ping_interval, broker, hub, running).await
}

/// Serves on an already-bound listener.
///
/// On shutdown every live connection is told to close with
/// [`CloseReason::Shutdown`].
pub async fn serve(
    listener: TcpListener,
    ping_interval: Duration,
    broker: Arc<Broker>,
    hub: Arc<ConnectionHub>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let port = listener
        .local_addr()
        .context("listener has no local address")?
        .port();
    let state = ApiState {
        broker,
        hub: Arc::clone(&hub),
        ping_interval,
        port,
    };
    let app = http_api::router(state).into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(running, hub))
        .await
        .context("relay server failed")
}

async fn wait_for_shutdown(running: Arc<AtomicBool>, hub: Arc<ConnectionHub>) {
    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(SHUTDOWN_POLL).await;
    }
    info!("shutdown flag set; closing connections");
    hub.close_all(CloseReason::Shutdown);
}

/// `GET /ws`: upgrades to a relay WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    connect: Option<ConnectInfo<SocketAddr>>,
    State(state): State<ApiState>,
) -> Response {
    upgrade(ws, peer_addr(connect), state)
}

/// Completes the handshake and hands the socket to a connection task.
pub fn upgrade(ws: WebSocketUpgrade, peer_addr: SocketAddr, state: ApiState) -> Response {
    debug!("upgrading connection from {peer_addr}");
    ws.on_upgrade(move |socket| handle_connection(socket, peer_addr, state))
}

/// The client address, or `0.0.0.0:0` when the router runs without
/// connect info (handler tests).
pub fn peer_addr(connect: Option<ConnectInfo<SocketAddr>>) -> SocketAddr {
    connect
        .map(|ConnectInfo(addr)| addr)
        .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(socket: WebSocket, peer_addr: SocketAddr, state: ApiState) {
    let ApiState {
        broker,
        hub,
        ping_interval,
        ..
    } = state;

    let conn = ConnectionId::new();
    let channels = hub.register(conn, peer_addr);
    info!(%conn, "connection established from {peer_addr}");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let result =
        run_message_loop(&mut ws_tx, &mut ws_rx, channels, conn, ping_interval, &broker).await;

    // Runs on every exit path: clean close, socket error, forced close.
    hub.remove(conn);
    broker.on_disconnect(conn);
    match result {
        Ok(()) => info!(%conn, "connection from {peer_addr} ended"),
        Err(e) => warn!(%conn, "connection from {peer_addr} ended with error: {e:#}"),
    }
}

async fn run_message_loop(
    ws_tx: &mut WsSink,
    ws_rx: &mut WsRecv,
    mut channels: ConnectionChannels,
    conn: ConnectionId,
    ping_interval: Duration,
    broker: &Broker,
) -> anyhow::Result<()> {
    let mut ping = interval(ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await; // The first tick fires immediately.

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(msg) => handle_client_msg(broker, conn, msg).await,
                            Err(e) => {
                                warn!(%conn, "malformed message: {e}");
                                Some(ServerMsg::malformed(e.to_string()))
                            }
                        };
                        if let Some(reply) = reply {
                            send_json(ws_tx, &reply).await?;
                        }
                    }
                    Some(Ok(WsMessage::Binary(_))) => {
                        warn!(%conn, "unexpected binary frame (ignored)");
                    }
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {}
                    Some(Ok(WsMessage::Close(_))) | None => {
                        debug!(%conn, "peer closed the WebSocket");
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        // Resets and protocol violations end up here alike.
                        debug!(%conn, "WebSocket closed abruptly: {e}");
                        return Ok(());
                    }
                }
            }

            Some(msg) = channels.outbound.recv() => {
                send_json(ws_tx, &msg).await?;
            }

            changed = channels.close.changed() => {
                if changed.is_err() {
                    // Hub entry is gone; nothing more can reach us.
                    return Ok(());
                }
                let reason = *channels.close.borrow_and_update();
                if let Some(reason) = reason {
                    // Deliver whatever was queued before the close request.
                    while let Ok(msg) = channels.outbound.try_recv() {
                        send_json(ws_tx, &msg).await?;
                    }
                    info!(%conn, %reason, "closing connection");
                    let frame = CloseFrame {
                        code: close_code::NORMAL,
                        reason: reason.as_str().into(),
                    };
                    // The peer may already be gone; the close is best effort.
                    let _ = ws_tx.send(WsMessage::Close(Some(frame))).await;
                    return Ok(());
                }
            }

            _ = ping.tick() => {
                ws_tx
                    .send(WsMessage::Ping(Vec::new()))
                    .await
                    .context("keepalive ping failed")?;
            }
        }
    }
}

async fn send_json(ws_tx: &mut WsSink, msg: &ServerMsg) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg).context("failed to encode outbound message")?;
    ws_tx
        .send(WsMessage::Text(json))
        .await
        .context("WebSocket send failed")
}
