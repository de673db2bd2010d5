//! Domain layer for share-relay.
//!
//! Pure configuration types.  The broker's own domain (sessions, bindings,
//! the wire protocol) lives in the `share-core` crate.

pub mod config;

pub use config::RelayConfig;
