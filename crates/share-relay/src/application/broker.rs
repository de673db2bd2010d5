//! The session broker facade.
//!
//! [`Broker`] ties the pieces together: it asks the allow-list validator
//! before any reservation, applies the transition to the session table,
//! and tells the affected connections about it through the [`Transport`].
//!
//! # Who is told what
//!
//! | Operation           | Requester gets          | Other participants get     |
//! |---------------------|-------------------------|----------------------------|
//! | `join`              | `join_result` (caller)  | `peer_connected`           |
//! | `release` / drop    | nothing                 | `peer_disconnected`        |
//! | `unregister_as`     | `unregister_result`     | closed (`session unregistered`) |
//! | `unregister` (HTTP) | HTTP response           | all closed                 |
//! | sweep eviction      | n/a                     | all closed (`idle timeout`) |

use std::sync::Arc;
use std::time::Instant;

use share_core::{
    BrokerError, BrokerPolicy, ConnectionId, Eviction, Identifier, JoinOutcome, RelayPayload,
    ReleaseOutcome, ServerMsg, SessionState, SessionSummary, SessionTable,
};
use tracing::{debug, info};

use crate::application::allow_list::AllowListValidator;
use crate::application::relay_router::RelayRouter;
use crate::application::transport::{CloseReason, Transport};

/// Owns the session table and every collaborator needed to drive it.
pub struct Broker {
    table: SessionTable,
    validator: AllowListValidator,
    router: RelayRouter,
    transport: Arc<dyn Transport>,
    policy: BrokerPolicy,
}

impl Broker {
    pub fn new(
        validator: AllowListValidator,
        transport: Arc<dyn Transport>,
        policy: BrokerPolicy,
    ) -> Self {
        Self {
            table: SessionTable::new(policy.join_policy),
            validator,
            router: RelayRouter::new(Arc::clone(&transport)),
            transport,
            policy,
        }
    }

    pub fn policy(&self) -> BrokerPolicy {
        self.policy
    }

    pub fn validator(&self) -> &AllowListValidator {
        &self.validator
    }

    /// Reserves `identifier` after checking the allow-list.
    ///
    /// `owner` is bound as the first participant when given; out-of-band
    /// registration passes `None`.
    ///
    /// # Errors
    ///
    /// `NotAllowed`, `UpstreamUnavailable`, `AlreadyReserved` or
    /// `AlreadyBound`.  No session is created on any error.
    pub async fn reserve(
        &self,
        identifier: &Identifier,
        owner: Option<ConnectionId>,
    ) -> Result<SessionState, BrokerError> {
        self.ensure_allowed(identifier).await?;
        let state = self.table.reserve(identifier, owner, Instant::now())?;
        info!(%identifier, "identifier reserved");
        Ok(state)
    }

    /// Binds `conn` to `identifier` after checking the allow-list, and
    /// notifies the participants that were already there.
    ///
    /// # Errors
    ///
    /// `NotAllowed`, `UpstreamUnavailable`, `AlreadyPaired`, `AlreadyBound`
    /// or (under the strict join policy) `NotRegistered`.
    pub async fn join(
        &self,
        identifier: &Identifier,
        conn: ConnectionId,
    ) -> Result<JoinOutcome, BrokerError> {
        self.ensure_allowed(identifier).await?;
        let outcome = self.table.join(identifier, conn, Instant::now())?;

        if outcome.newly_bound {
            for peer in &outcome.peers {
                self.transport.send(
                    *peer,
                    ServerMsg::PeerConnected {
                        identifier: identifier.to_string(),
                    },
                );
            }
            info!(%identifier, %conn, state = %outcome.state, "connection joined");
        }
        Ok(outcome)
    }

    /// Relays `payload` from `sender` to its peer.  See [`RelayRouter::relay`].
    pub fn relay(
        &self,
        identifier: &Identifier,
        sender: ConnectionId,
        payload: RelayPayload,
    ) -> Result<Vec<ConnectionId>, BrokerError> {
        self.router
            .relay(&self.table, identifier, sender, payload, Instant::now())
    }

    /// Unbinds `conn` and tells the remaining participant.  Idempotent.
    pub fn release(&self, identifier: &Identifier, conn: ConnectionId) -> ReleaseOutcome {
        let outcome = self.table.release(identifier, conn, Instant::now());
        if let ReleaseOutcome::Released { remaining } = &outcome {
            self.notify_departure(identifier, remaining);
        }
        outcome
    }

    /// Operator teardown: removes the session and closes every bound
    /// connection.  Returns how many were closed.
    ///
    /// # Errors
    ///
    /// `NotRegistered` if there is no session.
    pub fn unregister(&self, identifier: &Identifier) -> Result<usize, BrokerError> {
        let bound = self.table.unregister(identifier)?;
        for conn in &bound {
            self.transport.close(*conn, CloseReason::Unregistered);
        }
        info!(%identifier, closed = bound.len(), "identifier unregistered");
        Ok(bound.len())
    }

    /// Participant teardown: removes the session if `requester` is bound to
    /// it.  The requester stays connected; the others are closed.  Returns
    /// how many were closed.
    ///
    /// # Errors
    ///
    /// `NotRegistered` or `NotJoined`.
    pub fn unregister_as(
        &self,
        identifier: &Identifier,
        requester: ConnectionId,
    ) -> Result<usize, BrokerError> {
        let bound = self.table.unregister_as(identifier, requester)?;
        let mut closed = 0;
        for conn in bound.into_iter().filter(|c| *c != requester) {
            self.transport.close(conn, CloseReason::Unregistered);
            closed += 1;
        }
        info!(%identifier, %requester, closed, "identifier unregistered by participant");
        Ok(closed)
    }

    /// Releases whatever `conn` was bound to.  Safe to call more than once.
    pub fn on_disconnect(&self, conn: ConnectionId) {
        match self.table.disconnect(conn, Instant::now()) {
            Some((identifier, remaining)) => {
                info!(%identifier, %conn, "participant disconnected");
                self.notify_departure(&identifier, &remaining);
            }
            None => debug!(%conn, "disconnected without a binding"),
        }
    }

    /// Evicts idle sessions and closes their connections.
    pub fn sweep(&self, now: Instant) -> Vec<Eviction> {
        let evicted = self.table.sweep(now, self.policy.idle_timeout);
        for eviction in &evicted {
            for conn in &eviction.connections {
                self.transport.close(*conn, CloseReason::IdleTimeout);
            }
            info!(
                identifier = %eviction.identifier,
                state = %eviction.state,
                closed = eviction.connections.len(),
                "evicted idle session"
            );
        }
        evicted
    }

    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.table.snapshot(Instant::now())
    }

    pub fn state_of(&self, identifier: &Identifier) -> SessionState {
        self.table.state_of(identifier)
    }

    pub fn bindings_for(&self, identifier: &Identifier) -> Vec<ConnectionId> {
        self.table.bindings_for(identifier)
    }

    pub fn session_count(&self) -> usize {
        self.table.len()
    }

    /// Identifier `conn` is bound to, if any.
    pub fn identifier_of(&self, conn: ConnectionId) -> Option<Identifier> {
        self.table.registry().identifier_of(conn)
    }

    async fn ensure_allowed(&self, identifier: &Identifier) -> Result<(), BrokerError> {
        if self.validator.is_allowed(identifier).await? {
            Ok(())
        } else {
            debug!(%identifier, "identifier not on allow-list");
            Err(BrokerError::NotAllowed)
        }
    }

    fn notify_departure(&self, identifier: &Identifier, remaining: &[ConnectionId]) {
        for peer in remaining {
            self.transport.send(
                *peer,
                ServerMsg::PeerDisconnected {
                    identifier: identifier.to_string(),
                },
            );
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
