//! A single pairing session.
//!
//! # Lifecycle
//!
//! ```text
//!  (no entry) ──reserve──► Reserved ──join──► Paired
//!       ▲                     │ ▲               │
//!       │                     │ └────join───┐   │ release / disconnect
//!       │                     ▼             │   ▼
//!       └────sweep / unregister──────────── Idle
//! ```
//!
//! `Unregistered` is never stored; it is what [`SessionTable::state_of`]
//! reports for an identifier with no entry.
//!
//! [`SessionTable::state_of`]: crate::domain::session_table::SessionTable::state_of

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::domain::connection::ConnectionId;

/// Maximum number of connections bound to one session.
pub const MAX_PARTICIPANTS: usize = 2;

/// Observable state of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session exists.
    Unregistered,
    /// Exclusively held, awaiting a peer.
    Reserved,
    /// Two connections bound; relay is active.
    Paired,
    /// Pairing broken; the reservation is held for the grace window.
    Idle,
}

impl SessionState {
    /// Returns the snake_case name used on the wire and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unregistered => "unregistered",
            SessionState::Reserved => "reserved",
            SessionState::Paired => "paired",
            SessionState::Idle => "idle",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session record owned by the session table.
///
/// Connections are referenced only by handle; the record never owns a
/// socket.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    created_at: Instant,
    last_activity: Instant,
    bindings: Vec<ConnectionId>,
}

impl Session {
    /// Creates a freshly reserved session with no participants.
    pub fn new_reserved(now: Instant) -> Self {
        Self {
            state: SessionState::Reserved,
            created_at: now,
            last_activity: now,
            bindings: Vec::with_capacity(MAX_PARTICIPANTS),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Bound connections in join order.
    pub fn bindings(&self) -> &[ConnectionId] {
        &self.bindings
    }

    pub fn is_bound(&self, conn: ConnectionId) -> bool {
        self.bindings.contains(&conn)
    }

    pub fn is_full(&self) -> bool {
        self.bindings.len() >= MAX_PARTICIPANTS
    }

    /// Every bound connection except `conn`.
    pub fn peers_of(&self, conn: ConnectionId) -> Vec<ConnectionId> {
        self.bindings
            .iter()
            .copied()
            .filter(|c| *c != conn)
            .collect()
    }

    /// Adds `conn` as a participant and recomputes the state.
    ///
    /// Returns `false` without changing anything when the session is full
    /// or `conn` is already bound.
    pub(crate) fn bind(&mut self, conn: ConnectionId, now: Instant) -> bool {
        if self.is_full() || self.is_bound(conn) {
            return false;
        }
        self.bindings.push(conn);
        self.state = if self.is_full() {
            SessionState::Paired
        } else {
            SessionState::Reserved
        };
        self.last_activity = now;
        true
    }

    /// Removes `conn` and moves the session to `Idle`.
    ///
    /// Returns `false` if `conn` was not bound.
    pub(crate) fn unbind(&mut self, conn: ConnectionId, now: Instant) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|c| *c != conn);
        if self.bindings.len() == before {
            return false;
        }
        self.state = SessionState::Idle;
        self.last_activity = now;
        true
    }

    pub(crate) fn take_bindings(&mut self) -> Vec<ConnectionId> {
        std::mem::take(&mut self.bindings)
    }

    pub fn touch(&mut self, now: Instant) {
        // Instants from different call sites may arrive slightly out of order.
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// `true` once `idle_timeout` has fully elapsed since the last activity.
    pub fn is_expired(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) >= idle_timeout
    }

    /// `true` if the sweeper may evict this session at `now`.
    ///
    /// A `Reserved` session with a bound owner is waiting for its peer and is
    /// kept for as long as the owner stays connected.  An unowned
    /// reservation, an `Idle` session and a `Paired` session expire normally.
    pub fn is_sweepable(&self, now: Instant, idle_timeout: Duration) -> bool {
        if self.state == SessionState::Reserved && !self.bindings.is_empty() {
            return false;
        }
        self.is_expired(now, idle_timeout)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
