//! share-relay library crate.
//!
//! The relay pairs a controller and a controlled device under a shared
//! identifier and forwards commands between them over WebSocket.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Controller ─┐                                  ┌─ Controlled device
//!   (JSON/WS) │                                  │ (JSON/WS)
//!             ▼                                  ▼
//! [share-relay]
//!   ├── domain/           RelayConfig
//!   ├── application/      Broker facade, allow-list validator, relay router,
//!   │                     per-message dispatch, Transport seam
//!   └── infrastructure/
//!         ├── ws_server/        single listener, WebSocket upgrades (axum)
//!         ├── hub/              connection handle → outbound queue
//!         ├── allow_list_source HTTP / file allow-list fetchers
//!         ├── http_api/         operational HTTP API on the same port
//!         ├── sweeper/          idle-session eviction task
//!         └── config_file/      optional TOML configuration
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `share-core`, and reaches the
//!   outside world only through the [`application::Transport`] and
//!   [`application::AllowListSource`] traits.
//! - `infrastructure` depends on all other layers plus `tokio`, `reqwest`
//!   and `axum`.
//!
//! # For beginners: why this structure?
//!
//! The broker's rules (who may join, who receives a relayed command, when a
//! session is evicted) are tested in `application` with in-memory fakes.
//! Only the thin infrastructure layer needs real sockets.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: broker orchestration.
pub mod application;

/// Infrastructure layer: sockets, HTTP, files, background tasks.
pub mod infrastructure;
