//! Reverse index from connection handle to bound identifier.
//!
//! The registry is owned by [`SessionTable`] and only mutated from inside a
//! table transition while that identifier's entry lock is held.  Outside
//! the crate it is read-only.
//!
//! [`SessionTable`]: crate::domain::session_table::SessionTable

use std::time::Instant;

use dashmap::{mapref::entry::Entry, DashMap};

use crate::domain::{connection::ConnectionId, identifier::Identifier};
use crate::error::BrokerError;

#[derive(Debug, Clone)]
struct Binding {
    identifier: Identifier,
    bound_at: Instant,
}

/// Connection → identifier map with O(1) lookup.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    bindings: DashMap<ConnectionId, Binding>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier `conn` is bound to, if any.
    pub fn identifier_of(&self, conn: ConnectionId) -> Option<Identifier> {
        self.bindings.get(&conn).map(|b| b.identifier.clone())
    }

    /// Returns when `conn` was bound, if it is bound.
    pub fn bound_at(&self, conn: ConnectionId) -> Option<Instant> {
        self.bindings.get(&conn).map(|b| b.bound_at)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Binds `conn` to `identifier` unless it is already bound.
    ///
    /// The check and the insert happen under the registry's own entry lock,
    /// so two transitions on different identifiers cannot both claim the
    /// same connection.
    pub(crate) fn try_claim(
        &self,
        conn: ConnectionId,
        identifier: Identifier,
        now: Instant,
    ) -> Result<(), BrokerError> {
        match self.bindings.entry(conn) {
            Entry::Occupied(_) => Err(BrokerError::AlreadyBound),
            Entry::Vacant(entry) => {
                entry.insert(Binding {
                    identifier,
                    bound_at: now,
                });
                Ok(())
            }
        }
    }

    /// Removes `conn` only if it is still bound to `identifier`.
    pub(crate) fn unbind_if(&self, conn: ConnectionId, identifier: &Identifier) -> bool {
        self.bindings
            .remove_if(&conn, |_, b| &b.identifier == identifier)
            .is_some()
    }
}
