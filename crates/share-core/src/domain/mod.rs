//! Domain entities for the session broker.
//!
//! This module contains the broker's state and its transition rules.  It has
//! no imports from networking, async runtimes, or HTTP libraries, so every
//! rule can be unit-tested on a plain thread with synthetic timestamps.
//!
//! # Sub-modules
//!
//! - **`identifier`** – The externally issued token that names a session.
//! - **`connection`** – The opaque handle of one live network connection.
//! - **`policy`** – Tunables: idle timeout and the join policy.
//! - **`session`** – A single session record and its state enum.
//! - **`registry`** – Reverse map connection → identifier.
//! - **`session_table`** – The authoritative identifier → session map and
//!   every state transition.

pub mod connection;
pub mod identifier;
pub mod policy;
pub mod registry;
pub mod session;
pub mod session_table;
