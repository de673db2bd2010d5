//! Outbound seam between the broker and live connections.
//!
//! The broker never touches a socket.  It hands messages and close requests
//! to a [`Transport`], which the infrastructure layer implements with one
//! bounded queue per connection (see `infrastructure::hub`).  Tests plug in
//! a recording fake.

use share_core::{ConnectionId, ServerMsg};

/// Why the relay is forcibly closing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The session was torn down by `unregister`.
    Unregistered,
    /// The session was evicted by the idle sweeper.
    IdleTimeout,
    /// The relay is shutting down.
    Shutdown,
}

impl CloseReason {
    /// Text sent in the WebSocket Close frame.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Unregistered => "session unregistered",
            CloseReason::IdleTimeout => "idle timeout",
            CloseReason::Shutdown => "server shutting down",
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers messages to, and closes, live connections by handle.
///
/// Both methods are non-blocking.  A send to a connection whose queue is
/// full, or which has already gone away, returns `false` and the message is
/// dropped.
pub trait Transport: Send + Sync {
    fn send(&self, conn: ConnectionId, msg: ServerMsg) -> bool;

    fn close(&self, conn: ConnectionId, reason: CloseReason);
}
