//! # share-core
//!
//! Shared library for the Alpha Share relay containing the session broker
//! state machine, the connection registry, and the JSON wire protocol spoken
//! by both endpoints.
//!
//! This crate has zero dependencies on sockets, async runtimes, or HTTP.
//! Every state transition takes an explicit `now: Instant`, which keeps the
//! whole state machine deterministic under test.
//!
//! # Architecture overview (for beginners)
//!
//! Alpha Share pairs two remote endpoints (a *controller*, e.g. a phone, and
//! a *controlled device*, e.g. a desktop agent) under a shared identifier
//! and relays commands between them in real time.  The identifier is printed
//! as a QR code on the device and must appear on an externally maintained
//! allow-list.
//!
//! - **`domain`** – The session broker itself.  The [`SessionTable`] maps an
//!   identifier to its reservation/pairing state and owns the
//!   [`ConnectionRegistry`] (connection handle → identifier) so the two maps
//!   can never disagree.
//!
//! - **`protocol`** – The JSON messages that travel over the WebSocket in
//!   both directions.
//!
//! - **`error`** – The [`BrokerError`] taxonomy returned to connections as
//!   structured results.

pub mod domain;
pub mod error;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `share_core::SessionTable` instead of `share_core::domain::session_table::SessionTable`.
pub use domain::connection::ConnectionId;
pub use domain::identifier::Identifier;
pub use domain::policy::{BrokerPolicy, JoinPolicy};
pub use domain::registry::ConnectionRegistry;
pub use domain::session::{Session, SessionState, MAX_PARTICIPANTS};
pub use domain::session_table::{Eviction, JoinOutcome, ReleaseOutcome, SessionSummary, SessionTable};
pub use error::BrokerError;
pub use protocol::messages::{ClientMsg, RelayPayload, ServerMsg};
