//! Per-message dispatch for one connection.
//!
//! [`handle_client_msg`] turns a decoded [`ClientMsg`] into a broker call
//! and returns the reply for the requesting connection, if any.  Every
//! failure becomes a structured reply; nothing here closes the connection.

use share_core::{BrokerError, ClientMsg, ConnectionId, Identifier, RelayPayload, ServerMsg};
use tracing::{debug, warn};

use crate::application::broker::Broker;

/// Handles one inbound message from `conn`.
///
/// Returns `None` only for a relay that reached its peer; the sender gets
/// no acknowledgement in that case.
pub async fn handle_client_msg(
    broker: &Broker,
    conn: ConnectionId,
    msg: ClientMsg,
) -> Option<ServerMsg> {
    debug!(%conn, "received {}", client_msg_type_name(&msg));

    match msg {
        ClientMsg::Join { identifier } => {
            let parsed = match Identifier::parse(&identifier) {
                Ok(id) => id,
                Err(e) => return Some(ServerMsg::join_failed(identifier, &e)),
            };
            Some(match broker.join(&parsed, conn).await {
                Ok(outcome) => ServerMsg::join_ok(parsed.as_str(), outcome.state),
                Err(e) => {
                    warn!(identifier = %parsed, %conn, "join rejected: {e}");
                    ServerMsg::join_failed(parsed.as_str(), &e)
                }
            })
        }

        ClientMsg::Relay {
            identifier,
            command,
            parameters,
        } => {
            let parsed = match Identifier::parse(&identifier) {
                Ok(id) => id,
                Err(e) => return Some(ServerMsg::relay_failed(identifier, &e)),
            };
            let payload = RelayPayload {
                command,
                parameters,
            };
            match broker.relay(&parsed, conn, payload) {
                Ok(_) => None,
                Err(e) => {
                    log_relay_failure(&parsed, conn, &e);
                    Some(ServerMsg::relay_failed(parsed.as_str(), &e))
                }
            }
        }

        ClientMsg::Unregister { identifier } => {
            let parsed = match Identifier::parse(&identifier) {
                Ok(id) => id,
                Err(e) => return Some(ServerMsg::unregister_failed(identifier, &e)),
            };
            Some(match broker.unregister_as(&parsed, conn) {
                Ok(_) => ServerMsg::unregister_ok(parsed.as_str()),
                Err(e) => {
                    warn!(identifier = %parsed, %conn, "unregister rejected: {e}");
                    ServerMsg::unregister_failed(parsed.as_str(), &e)
                }
            })
        }
    }
}

/// Short name of a message variant for logs.  Never includes field values.
pub fn client_msg_type_name(msg: &ClientMsg) -> &'static str {
    match msg {
        ClientMsg::Join { .. } => "join",
        ClientMsg::Relay { .. } => "relay",
        ClientMsg::Unregister { .. } => "unregister",
    }
}

fn log_relay_failure(identifier: &Identifier, conn: ConnectionId, err: &BrokerError) {
    if err.is_retryable() {
        debug!(%identifier, %conn, "relay not delivered: {err}");
    } else {
        warn!(%identifier, %conn, "relay rejected: {err}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
