//! Live connection hub.
//!
//! Every accepted WebSocket registers here and receives two channels:
//!
//! - a bounded **outbound queue** (`mpsc`) of [`ServerMsg`]s the broker wants
//!   delivered to it, drained by the connection's own task in FIFO order;
//! - a **close signal** (`watch`) the broker flips to force the connection
//!   closed with a reason.
//!
//! The hub implements [`Transport`], which is all the broker ever sees.

use std::net::SocketAddr;
use std::time::Instant;

use dashmap::DashMap;
use share_core::{ConnectionId, ServerMsg};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::application::transport::{CloseReason, Transport};

/// Outbound queue depth per connection.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug)]
struct ConnectionEntry {
    tx: mpsc::Sender<ServerMsg>,
    close_tx: watch::Sender<Option<CloseReason>>,
    peer_addr: SocketAddr,
    connected_at: Instant,
}

/// Receiving ends handed to a connection task by [`ConnectionHub::register`].
#[derive(Debug)]
pub struct ConnectionChannels {
    pub outbound: mpsc::Receiver<ServerMsg>,
    pub close: watch::Receiver<Option<CloseReason>>,
}

/// Connection handle → delivery channels.
#[derive(Debug)]
pub struct ConnectionHub {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    capacity: usize,
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::with_capacity(OUTBOUND_QUEUE_CAPACITY)
    }

    /// A hub whose per-connection queues hold `capacity` messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Registers a newly accepted connection.
    pub fn register(&self, conn: ConnectionId, peer_addr: SocketAddr) -> ConnectionChannels {
        let (tx, outbound) = mpsc::channel(self.capacity);
        let (close_tx, close) = watch::channel(None);
        self.connections.insert(
            conn,
            ConnectionEntry {
                tx,
                close_tx,
                peer_addr,
                connected_at: Instant::now(),
            },
        );
        ConnectionChannels { outbound, close }
    }

    /// Forgets a connection.  Returns `false` if it was not registered.
    pub fn remove(&self, conn: ConnectionId) -> bool {
        self.connections.remove(&conn).is_some()
    }

    /// Signals every registered connection to close.
    pub fn close_all(&self, reason: CloseReason) {
        for entry in self.connections.iter() {
            entry.close_tx.send_replace(Some(reason));
        }
    }

    pub fn peer_addr(&self, conn: ConnectionId) -> Option<SocketAddr> {
        self.connections.get(&conn).map(|e| e.peer_addr)
    }

    /// How long `conn` has been connected.
    pub fn uptime(&self, conn: ConnectionId) -> Option<std::time::Duration> {
        self.connections.get(&conn).map(|e| e.connected_at.elapsed())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Transport for ConnectionHub {
    fn send(&self, conn: ConnectionId, msg: ServerMsg) -> bool {
        let Some(entry) = self.connections.get(&conn) else {
            debug!(%conn, "send to unknown connection dropped");
            return false;
        };
        match entry.tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%conn, peer = %entry.peer_addr, "outbound queue full; message dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    fn close(&self, conn: ConnectionId, reason: CloseReason) {
        if let Some(entry) = self.connections.get(&conn) {
            debug!(%conn, %reason, "closing connection");
            entry.close_tx.send_replace(Some(reason));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
