//! Error taxonomy for session broker operations.
//!
//! Every variant maps to a stable snake_case code via [`BrokerError::code`].
//! That code is what a connection sees in `join_result`, `relay_failed` and
//! `unregister_result` messages, so changing one is a wire-protocol change.

use thiserror::Error;

/// Errors returned by the session table, the allow-list validator and the
/// relay router.
///
/// These are returned synchronously to the requesting connection as
/// structured results.  None of them closes the connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// The identifier is not on the allow-list.
    ///
    /// Not retryable until the allow-list itself changes.
    #[error("identifier is not registered in the allow-list")]
    NotAllowed,

    /// A session already exists for the identifier (reserved, paired, or
    /// held during its grace window).
    #[error("identifier is already in use")]
    AlreadyReserved,

    /// Two connections are already bound to the identifier.
    #[error("identifier already has two participants")]
    AlreadyPaired,

    /// The connection is already bound to a different identifier.
    #[error("connection is already bound to another identifier")]
    AlreadyBound,

    /// No session exists for the identifier.
    #[error("identifier is not reserved")]
    NotRegistered,

    /// The requesting connection is not bound to the identifier.
    #[error("connection has not joined this identifier")]
    NotJoined,

    /// The relay found no counterpart bound to the identifier.
    ///
    /// Soft failure: the sender is still validly connected and may retry
    /// once its peer joins.
    #[error("no peer is connected for this identifier")]
    NoPeer,

    /// The allow-list could not be fetched in time.  Callers fail closed.
    #[error("allow-list unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The identifier string is empty, too long, or contains control
    /// characters.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl BrokerError {
    /// Returns the stable wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BrokerError::NotAllowed => "not_allowed",
            BrokerError::AlreadyReserved => "already_reserved",
            BrokerError::AlreadyPaired => "already_paired",
            BrokerError::AlreadyBound => "already_bound",
            BrokerError::NotRegistered => "not_registered",
            BrokerError::NotJoined => "not_joined",
            BrokerError::NoPeer => "no_peer",
            BrokerError::UpstreamUnavailable(_) => "upstream_unavailable",
            BrokerError::InvalidIdentifier(_) => "invalid_identifier",
        }
    }

    /// Returns `true` when retrying the same request later may succeed
    /// without any change to the allow-list or the session table.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BrokerError::NoPeer | BrokerError::UpstreamUnavailable(_)
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
