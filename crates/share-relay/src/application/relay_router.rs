//! Forwards relayed commands to the other participant of a session.
//!
//! The payload is never inspected: `command` and `parameters` are copied
//! into a `command` event exactly as received.  Ordering per sender holds
//! because each connection's inbound frames are handled one at a time by
//! its own task, and each peer drains a FIFO queue.

use std::sync::Arc;
use std::time::Instant;

use share_core::{BrokerError, ConnectionId, Identifier, RelayPayload, ServerMsg, SessionTable};
use tracing::{debug, warn};

use crate::application::transport::Transport;

/// Resolves peers through the session table and delivers via a [`Transport`].
pub struct RelayRouter {
    transport: Arc<dyn Transport>,
}

impl RelayRouter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Delivers `payload` from `sender` to every other connection bound to
    /// `identifier` and returns the connections it was handed to.
    ///
    /// Delivery is best effort: a peer whose queue is full is skipped and
    /// left out of the returned set.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::NotRegistered`] if no session exists.
    /// - [`BrokerError::NotJoined`] if `sender` is not bound to it.
    /// - [`BrokerError::NoPeer`] if `sender` is alone; nothing is delivered.
    pub fn relay(
        &self,
        table: &SessionTable,
        identifier: &Identifier,
        sender: ConnectionId,
        payload: RelayPayload,
        now: Instant,
    ) -> Result<Vec<ConnectionId>, BrokerError> {
        let peers = table.peers_of(identifier, sender, now)?;
        if peers.is_empty() {
            return Err(BrokerError::NoPeer);
        }

        let mut delivered = Vec::with_capacity(peers.len());
        for peer in peers {
            let msg = ServerMsg::command(identifier.as_str(), payload.clone());
            if self.transport.send(peer, msg) {
                delivered.push(peer);
            } else {
                warn!(%identifier, %peer, command = %payload.command, "peer queue unavailable; relay dropped");
            }
        }
        debug!(%identifier, %sender, command = %payload.command, delivered = delivered.len(), "relayed");
        Ok(delivered)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
