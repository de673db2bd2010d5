//! The authoritative identifier → session map.
//!
//! # How it works (for beginners)
//!
//! Every live session lives in a [`DashMap`] keyed by [`Identifier`].  A
//! `DashMap` is a concurrent hash map split into shards; calling
//! [`DashMap::entry`] locks the shard that holds one key until the returned
//! entry guard is dropped.  Each state transition below runs entirely inside
//! one such guard, which gives us:
//!
//! - **Linearizability per identifier.**  Two racing `join`s on the same
//!   identifier run one after the other, so exactly one wins the last slot.
//! - **Parallelism across identifiers.**  Transitions on identifiers that
//!   hash to different shards never wait for each other.
//!
//! The reverse index ([`ConnectionRegistry`]) is updated while the table
//! entry is still held, so the two maps never disagree.  A connection is
//! claimed through the registry's own entry lock, so two transitions on
//! different identifiers cannot both bind it.  Lock order is always table
//! entry first, registry second; nothing here takes a table lock while
//! holding a registry guard.
//!
//! Callers pass `now` explicitly so expiry rules can be tested without
//! sleeping.

use std::time::{Duration, Instant};

use dashmap::{mapref::entry::Entry, DashMap};
use serde::Serialize;
use tracing::debug;

use crate::domain::{
    connection::ConnectionId,
    identifier::Identifier,
    policy::JoinPolicy,
    registry::ConnectionRegistry,
    session::{Session, SessionState},
};
use crate::error::BrokerError;

// ── Outcome types ─────────────────────────────────────────────────────────────

/// Result of a successful [`SessionTable::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// State after the join (`Reserved` while awaiting a peer, `Paired` once
    /// two connections are bound).
    pub state: SessionState,
    /// Connections that were already bound before this join.
    pub peers: Vec<ConnectionId>,
    /// `false` when the connection was already bound (idempotent re-join).
    pub newly_bound: bool,
}

/// Result of [`SessionTable::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The binding was removed; `remaining` are the participants still bound.
    Released { remaining: Vec<ConnectionId> },
    /// Nothing to do: no session, or the connection was not bound to it.
    NotBound,
}

/// One session removed by [`SessionTable::sweep`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub identifier: Identifier,
    pub state: SessionState,
    /// Connections that were still bound and must be force-closed.
    pub connections: Vec<ConnectionId>,
}

/// Diagnostic view of one session, served by the operational HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub identifier: Identifier,
    pub state: SessionState,
    pub bound: usize,
    pub age_secs: u64,
    pub idle_secs: u64,
}

// ── SessionTable ──────────────────────────────────────────────────────────────

/// Owns every session and every connection binding.
#[derive(Debug)]
pub struct SessionTable {
    sessions: DashMap<Identifier, Session>,
    registry: ConnectionRegistry,
    join_policy: JoinPolicy,
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new(JoinPolicy::default())
    }
}

impl SessionTable {
    pub fn new(join_policy: JoinPolicy) -> Self {
        Self {
            sessions: DashMap::new(),
            registry: ConnectionRegistry::new(),
            join_policy,
        }
    }

    pub fn join_policy(&self) -> JoinPolicy {
        self.join_policy
    }

    /// Read-only access to the connection → identifier index.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Reserves `identifier`, optionally binding `owner` as its first
    /// participant.
    ///
    /// The caller is responsible for checking the allow-list first.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::AlreadyReserved`] if any session exists for the
    ///   identifier, whatever its state.
    /// - [`BrokerError::AlreadyBound`] if `owner` is bound elsewhere.
    pub fn reserve(
        &self,
        identifier: &Identifier,
        owner: Option<ConnectionId>,
        now: Instant,
    ) -> Result<SessionState, BrokerError> {
        match self.sessions.entry(identifier.clone()) {
            Entry::Occupied(_) => Err(BrokerError::AlreadyReserved),
            Entry::Vacant(entry) => {
                let mut session = Session::new_reserved(now);
                if let Some(conn) = owner {
                    self.registry.try_claim(conn, identifier.clone(), now)?;
                    session.bind(conn, now);
                }
                let state = session.state();
                entry.insert(session);
                debug!(%identifier, owner = ?owner.map(|c| c.to_string()), "reserved");
                Ok(state)
            }
        }
    }

    /// Binds `conn` to `identifier`.
    ///
    /// Re-joining an identifier the connection is already bound to succeeds
    /// without changes.  With [`JoinPolicy::ReserveOnJoin`] a join on an
    /// identifier with no session reserves it first, in the same step.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::AlreadyPaired`] if two other connections are bound.
    /// - [`BrokerError::AlreadyBound`] if `conn` is bound to another
    ///   identifier.
    /// - [`BrokerError::NotRegistered`] if no session exists and the policy
    ///   is [`JoinPolicy::RequireReservation`].
    pub fn join(
        &self,
        identifier: &Identifier,
        conn: ConnectionId,
        now: Instant,
    ) -> Result<JoinOutcome, BrokerError> {
        match self.sessions.entry(identifier.clone()) {
            Entry::Occupied(mut entry) => {
                let session = entry.get_mut();
                if session.is_bound(conn) {
                    session.touch(now);
                    return Ok(JoinOutcome {
                        state: session.state(),
                        peers: session.peers_of(conn),
                        newly_bound: false,
                    });
                }
                if session.is_full() {
                    return Err(match self.registry.identifier_of(conn) {
                        Some(_) => BrokerError::AlreadyBound,
                        None => BrokerError::AlreadyPaired,
                    });
                }
                self.registry.try_claim(conn, identifier.clone(), now)?;
                let peers = session.peers_of(conn);
                session.bind(conn, now);
                debug!(%identifier, %conn, state = %session.state(), "joined");
                Ok(JoinOutcome {
                    state: session.state(),
                    peers,
                    newly_bound: true,
                })
            }
            Entry::Vacant(entry) => match self.join_policy {
                JoinPolicy::RequireReservation => Err(BrokerError::NotRegistered),
                JoinPolicy::ReserveOnJoin => {
                    self.registry.try_claim(conn, identifier.clone(), now)?;
                    let mut session = Session::new_reserved(now);
                    session.bind(conn, now);
                    let state = session.state();
                    entry.insert(session);
                    debug!(%identifier, %conn, "reserved on join");
                    Ok(JoinOutcome {
                        state,
                        peers: Vec::new(),
                        newly_bound: true,
                    })
                }
            },
        }
    }

    /// Unbinds `conn` from `identifier`; the session becomes `Idle` and keeps
    /// its reservation until swept.  Idempotent.
    pub fn release(
        &self,
        identifier: &Identifier,
        conn: ConnectionId,
        now: Instant,
    ) -> ReleaseOutcome {
        let Some(mut session) = self.sessions.get_mut(identifier) else {
            return ReleaseOutcome::NotBound;
        };
        if !session.unbind(conn, now) {
            return ReleaseOutcome::NotBound;
        }
        self.registry.unbind_if(conn, identifier);
        debug!(%identifier, %conn, "released");
        ReleaseOutcome::Released {
            remaining: session.bindings().to_vec(),
        }
    }

    /// Releases whatever `conn` is bound to.
    ///
    /// Graceful and abrupt closes both end up here.  Returns the identifier
    /// and its remaining participants, or `None` if `conn` was not bound
    /// (so a second call is a no-op).
    pub fn disconnect(
        &self,
        conn: ConnectionId,
        now: Instant,
    ) -> Option<(Identifier, Vec<ConnectionId>)> {
        let identifier = self.registry.identifier_of(conn)?;
        match self.release(&identifier, conn, now) {
            ReleaseOutcome::Released { remaining } => Some((identifier, remaining)),
            ReleaseOutcome::NotBound => {
                // Session already gone; drop any leftover index entry.
                self.registry.unbind_if(conn, &identifier);
                None
            }
        }
    }

    /// Removes the session immediately and returns every connection that was
    /// bound to it.
    ///
    /// # Errors
    ///
    /// [`BrokerError::NotRegistered`] if no session exists.
    pub fn unregister(&self, identifier: &Identifier) -> Result<Vec<ConnectionId>, BrokerError> {
        match self.sessions.entry(identifier.clone()) {
            Entry::Vacant(_) => Err(BrokerError::NotRegistered),
            Entry::Occupied(mut entry) => {
                let bound = entry.get_mut().take_bindings();
                for conn in &bound {
                    self.registry.unbind_if(*conn, identifier);
                }
                entry.remove();
                debug!(%identifier, closed = bound.len(), "unregistered");
                Ok(bound)
            }
        }
    }

    /// Like [`unregister`](Self::unregister), but only if `requester` is one
    /// of the bound participants.  The check and the removal happen under
    /// the same entry lock.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::NotRegistered`] if no session exists.
    /// - [`BrokerError::NotJoined`] if `requester` is not bound to it.
    pub fn unregister_as(
        &self,
        identifier: &Identifier,
        requester: ConnectionId,
    ) -> Result<Vec<ConnectionId>, BrokerError> {
        match self.sessions.entry(identifier.clone()) {
            Entry::Vacant(_) => Err(BrokerError::NotRegistered),
            Entry::Occupied(mut entry) => {
                if !entry.get().is_bound(requester) {
                    return Err(BrokerError::NotJoined);
                }
                let bound = entry.get_mut().take_bindings();
                for conn in &bound {
                    self.registry.unbind_if(*conn, identifier);
                }
                entry.remove();
                debug!(%identifier, %requester, "unregistered by participant");
                Ok(bound)
            }
        }
    }

    /// Returns the participants other than `sender` and records activity.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::NotRegistered`] if no session exists.
    /// - [`BrokerError::NotJoined`] if `sender` is not bound to it.
    pub fn peers_of(
        &self,
        identifier: &Identifier,
        sender: ConnectionId,
        now: Instant,
    ) -> Result<Vec<ConnectionId>, BrokerError> {
        let mut session = self
            .sessions
            .get_mut(identifier)
            .ok_or(BrokerError::NotRegistered)?;
        if !session.is_bound(sender) {
            return Err(BrokerError::NotJoined);
        }
        session.touch(now);
        Ok(session.peers_of(sender))
    }

    /// Evicts every session whose last activity is at least `idle_timeout`
    /// old, except a `Reserved` session whose owner is still bound (see
    /// [`Session::is_sweepable`]).
    pub fn sweep(&self, now: Instant, idle_timeout: Duration) -> Vec<Eviction> {
        let candidates: Vec<Identifier> = self
            .sessions
            .iter()
            .filter(|e| e.value().is_sweepable(now, idle_timeout))
            .map(|e| e.key().clone())
            .collect();

        let mut evicted = Vec::with_capacity(candidates.len());
        for identifier in candidates {
            let Entry::Occupied(mut entry) = self.sessions.entry(identifier) else {
                continue;
            };
            // Activity may have happened between the scan and this lock.
            if !entry.get().is_sweepable(now, idle_timeout) {
                continue;
            }
            let state = entry.get().state();
            let connections = entry.get_mut().take_bindings();
            for conn in &connections {
                self.registry.unbind_if(*conn, entry.key());
            }
            let (identifier, _) = entry.remove_entry();
            debug!(%identifier, %state, "evicted idle session");
            evicted.push(Eviction {
                identifier,
                state,
                connections,
            });
        }
        evicted
    }

    pub fn state_of(&self, identifier: &Identifier) -> SessionState {
        self.sessions
            .get(identifier)
            .map(|s| s.state())
            .unwrap_or(SessionState::Unregistered)
    }

    pub fn bindings_for(&self, identifier: &Identifier) -> Vec<ConnectionId> {
        self.sessions
            .get(identifier)
            .map(|s| s.bindings().to_vec())
            .unwrap_or_default()
    }

    /// Point-in-time listing of every session, sorted by identifier.
    pub fn snapshot(&self, now: Instant) -> Vec<SessionSummary> {
        let mut out: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|e| {
                let session = e.value();
                SessionSummary {
                    identifier: e.key().clone(),
                    state: session.state(),
                    bound: session.bindings().len(),
                    age_secs: now.saturating_duration_since(session.created_at()).as_secs(),
                    idle_secs: now
                        .saturating_duration_since(session.last_activity())
                        .as_secs(),
                }
            })
            .collect();
        out.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        out
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        Identifier::parse(s).unwrap()
    }

    const IDLE: Duration = Duration::from_secs(300);

    // ── reserve ───────────────────────────────────────────────────────────────

    #[test]
    fn test_reserve_creates_reserved_session() {
        // Arrange
        let table = SessionTable::default();
        let now = Instant::now();

        // Act
        let state = table.reserve(&id("abc"), None, now).unwrap();

        // Assert
        assert_eq!(state, SessionState::Reserved);
        assert_eq!(table.state_of(&id("abc")), SessionState::Reserved);
        assert!(table.bindings_for(&id("abc")).is_empty());
    }

    #[test]
    fn test_reserve_twice_fails_already_reserved() {
        let table = SessionTable::default();
        let now = Instant::now();
        table.reserve(&id("abc"), None, now).unwrap();

        assert_eq!(
            table.reserve(&id("abc"), None, now),
            Err(BrokerError::AlreadyReserved)
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reserve_with_owner_binds_it() {
        let table = SessionTable::default();
        let conn = ConnectionId::new();

        table.reserve(&id("abc"), Some(conn), Instant::now()).unwrap();

        assert_eq!(table.bindings_for(&id("abc")), vec![conn]);
        assert_eq!(table.registry().identifier_of(conn), Some(id("abc")));
    }

    #[test]
    fn test_reserve_with_owner_bound_elsewhere_fails_and_leaves_no_session() {
        let table = SessionTable::default();
        let conn = ConnectionId::new();
        let now = Instant::now();
        table.reserve(&id("abc"), Some(conn), now).unwrap();

        assert_eq!(
            table.reserve(&id("xyz"), Some(conn), now),
            Err(BrokerError::AlreadyBound)
        );
        assert_eq!(table.state_of(&id("xyz")), SessionState::Unregistered);
    }

    // ── join ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_join_second_connection_pairs_and_reports_peer() {
        // Arrange
        let table = SessionTable::default();
        let now = Instant::now();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        table.reserve(&id("abc"), Some(a), now).unwrap();

        // Act
        let outcome = table.join(&id("abc"), b, now).unwrap();

        // Assert
        assert_eq!(outcome.state, SessionState::Paired);
        assert_eq!(outcome.peers, vec![a]);
        assert!(outcome.newly_bound);
    }

    #[test]
    fn test_join_third_connection_fails_already_paired() {
        let table = SessionTable::default();
        let now = Instant::now();
        let (a, b, c) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
        table.join(&id("abc"), a, now).unwrap();
        table.join(&id("abc"), b, now).unwrap();

        assert_eq!(table.join(&id("abc"), c, now), Err(BrokerError::AlreadyPaired));
        assert_eq!(table.registry().identifier_of(c), None);
    }

    #[test]
    fn test_rejoin_same_identifier_is_idempotent() {
        let table = SessionTable::default();
        let now = Instant::now();
        let a = ConnectionId::new();
        table.join(&id("abc"), a, now).unwrap();

        let outcome = table.join(&id("abc"), a, now).unwrap();

        assert!(!outcome.newly_bound);
        assert_eq!(table.bindings_for(&id("abc")), vec![a]);
    }

    #[test]
    fn test_join_other_identifier_fails_already_bound() {
        let table = SessionTable::default();
        let now = Instant::now();
        let a = ConnectionId::new();
        table.join(&id("abc"), a, now).unwrap();

        assert_eq!(table.join(&id("xyz"), a, now), Err(BrokerError::AlreadyBound));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_join_unregistered_reserves_under_default_policy() {
        let table = SessionTable::new(JoinPolicy::ReserveOnJoin);
        let a = ConnectionId::new();

        let outcome = table.join(&id("abc"), a, Instant::now()).unwrap();

        assert_eq!(outcome.state, SessionState::Reserved);
        assert!(outcome.peers.is_empty());
    }

    #[test]
    fn test_join_unregistered_fails_when_reservation_required() {
        let table = SessionTable::new(JoinPolicy::RequireReservation);

        let result = table.join(&id("abc"), ConnectionId::new(), Instant::now());

        assert_eq!(result, Err(BrokerError::NotRegistered));
        assert!(table.is_empty());
    }

    #[test]
    fn test_join_after_http_reservation_when_reservation_required() {
        let table = SessionTable::new(JoinPolicy::RequireReservation);
        let now = Instant::now();
        table.reserve(&id("abc"), None, now).unwrap();

        let outcome = table.join(&id("abc"), ConnectionId::new(), now).unwrap();

        assert_eq!(outcome.state, SessionState::Reserved);
    }

    // ── release / disconnect ──────────────────────────────────────────────────

    #[test]
    fn test_release_moves_to_idle_and_keeps_remaining_participant() {
        // Arrange
        let table = SessionTable::default();
        let now = Instant::now();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        table.join(&id("abc"), a, now).unwrap();
        table.join(&id("abc"), b, now).unwrap();

        // Act
        let outcome = table.release(&id("abc"), a, now);

        // Assert
        assert_eq!(outcome, ReleaseOutcome::Released { remaining: vec![b] });
        assert_eq!(table.state_of(&id("abc")), SessionState::Idle);
        assert_eq!(table.registry().identifier_of(a), None);
        assert_eq!(table.registry().identifier_of(b), Some(id("abc")));
    }

    #[test]
    fn test_release_is_idempotent() {
        let table = SessionTable::default();
        let now = Instant::now();
        let a = ConnectionId::new();
        table.join(&id("abc"), a, now).unwrap();

        table.release(&id("abc"), a, now);
        let second = table.release(&id("abc"), a, now);

        assert_eq!(second, ReleaseOutcome::NotBound);
        assert_eq!(table.state_of(&id("abc")), SessionState::Idle);
        assert_eq!(
            table.release(&id("never"), a, now),
            ReleaseOutcome::NotBound
        );
    }

    #[test]
    fn test_disconnect_releases_binding_once() {
        let table = SessionTable::default();
        let now = Instant::now();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        table.join(&id("abc"), a, now).unwrap();
        table.join(&id("abc"), b, now).unwrap();

        assert_eq!(table.disconnect(a, now), Some((id("abc"), vec![b])));
        assert_eq!(table.disconnect(a, now), None);
        assert_eq!(table.disconnect(ConnectionId::new(), now), None);
    }

    // ── unregister ────────────────────────────────────────────────────────────

    #[test]
    fn test_unregister_removes_session_and_every_binding() {
        let table = SessionTable::default();
        let now = Instant::now();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        table.join(&id("abc"), a, now).unwrap();
        table.join(&id("abc"), b, now).unwrap();

        let closed = table.unregister(&id("abc")).unwrap();

        assert_eq!(closed, vec![a, b]);
        assert_eq!(table.state_of(&id("abc")), SessionState::Unregistered);
        assert!(table.registry().is_empty());
        assert_eq!(table.unregister(&id("abc")), Err(BrokerError::NotRegistered));
    }

    #[test]
    fn test_unregister_as_requires_requester_to_be_bound() {
        // Arrange
        let table = SessionTable::default();
        let now = Instant::now();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        table.join(&id("abc"), a, now).unwrap();
        table.join(&id("abc"), b, now).unwrap();

        // Act
        let stranger = table.unregister_as(&id("abc"), ConnectionId::new());
        let owner = table.unregister_as(&id("abc"), a);

        // Assert
        assert_eq!(stranger, Err(BrokerError::NotJoined));
        assert_eq!(owner, Ok(vec![a, b]));
        assert_eq!(table.state_of(&id("abc")), SessionState::Unregistered);
        assert_eq!(
            table.unregister_as(&id("abc"), a),
            Err(BrokerError::NotRegistered)
        );
    }

    // ── peers_of ──────────────────────────────────────────────────────────────

    #[test]
    fn test_peers_of_excludes_sender_and_touches_activity() {
        let table = SessionTable::default();
        let start = Instant::now();
        let later = start + Duration::from_secs(200);
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        table.join(&id("abc"), a, start).unwrap();
        table.join(&id("abc"), b, start).unwrap();

        let peers = table.peers_of(&id("abc"), b, later).unwrap();

        assert_eq!(peers, vec![a]);
        // Activity at `later` keeps the session alive past start + IDLE.
        assert!(table.sweep(start + IDLE, IDLE).is_empty());
    }

    #[test]
    fn test_peers_of_errors() {
        let table = SessionTable::default();
        let now = Instant::now();
        table.join(&id("abc"), ConnectionId::new(), now).unwrap();

        assert_eq!(
            table.peers_of(&id("nope"), ConnectionId::new(), now),
            Err(BrokerError::NotRegistered)
        );
        assert_eq!(
            table.peers_of(&id("abc"), ConnectionId::new(), now),
            Err(BrokerError::NotJoined)
        );
    }

    // ── sweep ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_sweep_evicts_only_expired_sessions() {
        // Arrange: "old" went idle at `start` with `b` still bound.
        let table = SessionTable::default();
        let start = Instant::now();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());
        table.join(&id("old"), a, start).unwrap();
        table.join(&id("old"), b, start).unwrap();
        table.release(&id("old"), a, start);
        table
            .reserve(&id("fresh"), None, start + Duration::from_secs(100))
            .unwrap();

        // Act
        let evicted = table.sweep(start + IDLE, IDLE);

        // Assert
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].identifier, id("old"));
        assert_eq!(evicted[0].state, SessionState::Idle);
        assert_eq!(evicted[0].connections, vec![b]);
        assert_eq!(table.state_of(&id("old")), SessionState::Unregistered);
        assert_eq!(table.state_of(&id("fresh")), SessionState::Reserved);
        assert_eq!(table.registry().identifier_of(b), None);
    }

    #[test]
    fn test_sweep_keeps_owner_waiting_for_peer() {
        // Arrange
        let table = SessionTable::default();
        let start = Instant::now();
        let owner = ConnectionId::new();
        table.reserve(&id("abc"), Some(owner), start).unwrap();

        // Act: far past the idle threshold.
        let evicted = table.sweep(start + IDLE + Duration::from_secs(3600), IDLE);

        // Assert
        assert!(evicted.is_empty());
        assert_eq!(table.state_of(&id("abc")), SessionState::Reserved);
        assert_eq!(table.registry().identifier_of(owner), Some(id("abc")));
    }

    #[test]
    fn test_sweep_evicts_unowned_reservation_after_grace_window() {
        let table = SessionTable::default();
        let start = Instant::now();
        table.reserve(&id("abc"), None, start).unwrap();

        let evicted = table.sweep(start + IDLE, IDLE);

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].state, SessionState::Reserved);
        assert!(evicted[0].connections.is_empty());
        assert_eq!(table.state_of(&id("abc")), SessionState::Unregistered);
    }

    #[test]
    fn test_sweep_evicts_owner_once_it_leaves() {
        let table = SessionTable::default();
        let start = Instant::now();
        let owner = ConnectionId::new();
        table.reserve(&id("abc"), Some(owner), start).unwrap();
        table.disconnect(owner, start);

        let evicted = table.sweep(start + IDLE, IDLE);

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].state, SessionState::Idle);
    }

    #[test]
    fn test_sweep_applies_to_paired_sessions_too() {
        let table = SessionTable::default();
        let start = Instant::now();
        table.join(&id("abc"), ConnectionId::new(), start).unwrap();
        table.join(&id("abc"), ConnectionId::new(), start).unwrap();

        let evicted = table.sweep(start + IDLE, IDLE);

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].state, SessionState::Paired);
        assert_eq!(evicted[0].connections.len(), 2);
    }

    // ── snapshot ──────────────────────────────────────────────────────────────

    #[test]
    fn test_snapshot_reports_sorted_summaries() {
        let table = SessionTable::default();
        let start = Instant::now();
        table.reserve(&id("b"), None, start).unwrap();
        table.join(&id("a"), ConnectionId::new(), start).unwrap();

        let summaries = table.snapshot(start + Duration::from_secs(7));

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].identifier, id("a"));
        assert_eq!(summaries[0].bound, 1);
        assert_eq!(summaries[1].bound, 0);
        assert_eq!(summaries[1].idle_secs, 7);
    }
}
