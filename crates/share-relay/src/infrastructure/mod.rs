//! Infrastructure layer for share-relay.
//!
//! Everything that touches the outside world lives here.
//!
//! # Responsibilities
//!
//! - Binding the single listener and running one task per WebSocket
//!   connection
//! - Holding each connection's outbound queue and close signal
//! - Fetching the allow-list over HTTP or from a file
//! - Serving the operational HTTP API on that same listener
//! - Running the idle-session sweeper
//! - Loading the optional TOML configuration file
//!
//! # What does NOT belong here?
//!
//! - Session rules and peer notification (that is the application layer)
//! - Message type definitions (those live in `share-core`)

pub mod allow_list_source;
pub mod config_file;
pub mod http_api;
pub mod hub;
pub mod sweeper;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use allow_list_source::{source_from_location, FileAllowListSource, HttpAllowListSource};
pub use config_file::{load_config_file, ConfigError, FileConfig};
pub use http_api::{router, ApiState};
pub use hub::ConnectionHub;
pub use sweeper::spawn_sweeper;
pub use ws_server::{run_server, serve};
