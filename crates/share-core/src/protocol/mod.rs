//! Wire protocol between endpoints and the relay.
//!
//! Every WebSocket text frame carries one JSON object with a `"type"`
//! discriminator.  See [`messages`] for the full message set.

pub mod messages;
