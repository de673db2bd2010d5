//! Application layer for share-relay.
//!
//! The application layer knows *what* the relay does (validate, pair, relay,
//! tear down) but reaches sockets and HTTP only through traits.
//!
//! # Responsibilities
//!
//! - Validating identifiers against the allow-list with a TTL cache
//! - Orchestrating session table transitions and peer notifications
//! - Routing relayed commands to the bound peer
//! - Turning one inbound [`share_core::ClientMsg`] into its reply
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or HTTP clients (that is infrastructure)
//! - Spawning tasks or timers (infrastructure)

pub mod allow_list;
pub mod broker;
pub mod relay_router;
pub mod session_handler;
pub mod transport;

pub use allow_list::{parse_allow_list, AllowListSource, AllowListValidator, SourceError};
pub use broker::Broker;
pub use relay_router::RelayRouter;
pub use session_handler::{client_msg_type_name, handle_client_msg};
pub use transport::{CloseReason, Transport};
