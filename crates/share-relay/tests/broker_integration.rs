//! Integration tests for the broker facade.
//!
//! # Purpose
//!
//! These tests drive [`Broker`] through its public API with an in-memory
//! allow-list and a recording transport, so every peer notification and
//! forced close can be asserted on.  They verify:
//!
//! - The pairing lifecycle from reservation to eviction and reuse.
//! - Rejection of identifiers missing from the allow-list.
//! - Fail-closed behaviour when the allow-list cannot be fetched in time.
//! - Revocation: an identifier removed from the list stops being accepted
//!   once the cached copy expires.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{broker_with, StalledSource, SwappableSource, TTL};
use serde_json::json;
use share_core::{
    BrokerError, BrokerPolicy, ConnectionId, Identifier, JoinPolicy, RelayPayload, ServerMsg,
    SessionState,
};
use share_relay::application::CloseReason;
use tokio_test::{assert_err, assert_ok};

fn id(raw: &str) -> Identifier {
    Identifier::parse(raw).unwrap()
}

fn ping() -> RelayPayload {
    RelayPayload {
        command: "ping".to_string(),
        parameters: json!({ "seq": 1 }),
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// reserve → AlreadyReserved → pair → relay → disconnect → evict → reuse.
#[tokio::test]
async fn test_pairing_lifecycle_through_broker() {
    // Arrange
    let (broker, transport) = broker_with(
        SwappableSource::new("abc\n"),
        TTL,
        BrokerPolicy::default(),
    );
    let (conn_a, conn_b) = (ConnectionId::new(), ConnectionId::new());
    let abc = id("abc");

    // Reserve with A as owner; a second reservation is refused.
    assert_eq!(
        broker.reserve(&abc, Some(conn_a)).await,
        Ok(SessionState::Reserved)
    );
    assert_eq!(
        broker.reserve(&abc, None).await,
        Err(BrokerError::AlreadyReserved)
    );

    // B joins: the session pairs and A hears about it.
    let outcome = assert_ok!(broker.join(&abc, conn_b).await);
    assert_eq!(outcome.state, SessionState::Paired);
    assert_eq!(
        transport.sent_to(conn_a),
        vec![ServerMsg::PeerConnected {
            identifier: "abc".to_string()
        }]
    );

    // B relays: only A receives the payload, unchanged.
    let delivered = assert_ok!(broker.relay(&abc, conn_b, ping()));
    assert_eq!(delivered, vec![conn_a]);
    assert_eq!(
        transport.sent_to(conn_a).last(),
        Some(&ServerMsg::Command {
            identifier: "abc".to_string(),
            command: "ping".to_string(),
            parameters: json!({ "seq": 1 }),
        })
    );
    assert!(transport.sent_to(conn_b).is_empty());

    // A drops: the session goes idle and B is told.
    broker.on_disconnect(conn_a);
    assert_eq!(broker.state_of(&abc), SessionState::Idle);
    assert_eq!(
        transport.sent_to(conn_b),
        vec![ServerMsg::PeerDisconnected {
            identifier: "abc".to_string()
        }]
    );

    // Past the idle threshold the sweep evicts it and closes B.
    let later = Instant::now() + Duration::from_secs(301);
    let evicted = broker.sweep(later);
    assert_eq!(evicted.len(), 1);
    assert_eq!(broker.state_of(&abc), SessionState::Unregistered);
    assert_eq!(transport.closed(), vec![(conn_b, CloseReason::IdleTimeout)]);

    // The identifier is reusable.
    assert_eq!(broker.reserve(&abc, None).await, Ok(SessionState::Reserved));
}

#[tokio::test]
async fn test_unlisted_identifier_is_rejected_without_session() {
    let (broker, _transport) = broker_with(
        SwappableSource::new("abc\n"),
        TTL,
        BrokerPolicy::default(),
    );

    assert_eq!(
        broker.reserve(&id("xyz"), None).await,
        Err(BrokerError::NotAllowed)
    );
    assert_eq!(broker.session_count(), 0);
    assert_eq!(broker.state_of(&id("xyz")), SessionState::Unregistered);
}

#[tokio::test]
async fn test_relay_without_peer_is_soft_failure() {
    let (broker, transport) = broker_with(
        SwappableSource::new("abc\n"),
        TTL,
        BrokerPolicy::default(),
    );
    let conn = ConnectionId::new();
    assert_ok!(broker.join(&id("abc"), conn).await);

    assert_eq!(
        broker.relay(&id("abc"), conn, ping()),
        Err(BrokerError::NoPeer)
    );
    assert!(transport.sent_to(conn).is_empty());
    // Still bound; a later peer can pair.
    assert_eq!(broker.identifier_of(conn), Some(id("abc")));
}

#[tokio::test]
async fn test_participant_unregister_closes_only_the_other_side() {
    // Arrange
    let (broker, transport) = broker_with(
        SwappableSource::new("abc\n"),
        TTL,
        BrokerPolicy::default(),
    );
    let (conn_a, conn_b) = (ConnectionId::new(), ConnectionId::new());
    assert_ok!(broker.join(&id("abc"), conn_a).await);
    assert_ok!(broker.join(&id("abc"), conn_b).await);

    // Act
    let closed = assert_ok!(broker.unregister_as(&id("abc"), conn_a));

    // Assert
    assert_eq!(closed, 1);
    assert_eq!(transport.closed(), vec![(conn_b, CloseReason::Unregistered)]);
    assert_eq!(broker.state_of(&id("abc")), SessionState::Unregistered);
    assert_eq!(broker.identifier_of(conn_a), None);
}

#[tokio::test]
async fn test_outsider_cannot_unregister() {
    let (broker, transport) = broker_with(
        SwappableSource::new("abc\n"),
        TTL,
        BrokerPolicy::default(),
    );
    assert_ok!(broker.join(&id("abc"), ConnectionId::new()).await);

    let result = broker.unregister_as(&id("abc"), ConnectionId::new());

    assert_eq!(result, Err(BrokerError::NotJoined));
    assert!(transport.closed().is_empty());
    assert_eq!(broker.session_count(), 1);
}

#[tokio::test]
async fn test_strict_policy_requires_prior_reservation() {
    let policy = BrokerPolicy {
        join_policy: JoinPolicy::RequireReservation,
        ..BrokerPolicy::default()
    };
    let (broker, _transport) = broker_with(SwappableSource::new("abc\n"), TTL, policy);
    let conn = ConnectionId::new();

    assert_eq!(
        broker.join(&id("abc"), conn).await.map(|o| o.state),
        Err(BrokerError::NotRegistered)
    );

    assert_ok!(broker.reserve(&id("abc"), None).await);
    let outcome = assert_ok!(broker.join(&id("abc"), conn).await);
    assert_eq!(outcome.state, SessionState::Reserved);
}

// ── Allow-list failure modes ──────────────────────────────────────────────────

#[tokio::test]
async fn test_stalled_allow_list_fails_closed() {
    let (broker, _transport) = broker_with(Arc::new(StalledSource), TTL, BrokerPolicy::default());

    let started = Instant::now();
    let err = assert_err!(broker.reserve(&id("abc"), None).await);

    assert!(matches!(err, BrokerError::UpstreamUnavailable(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(broker.session_count(), 0);
}

#[tokio::test]
async fn test_revoked_identifier_rejected_after_ttl() {
    // Arrange: a TTL short enough to expire inside the test.
    let source = SwappableSource::new("abc\n");
    let (broker, _transport) = broker_with(
        source.clone(),
        Duration::from_millis(50),
        BrokerPolicy::default(),
    );
    assert_ok!(broker.reserve(&id("abc"), None).await);
    assert_ok!(broker.unregister(&id("abc")));

    // Act: revoke, then wait out the cache.
    source.set("def\n");
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Assert
    assert_eq!(
        broker.reserve(&id("abc"), None).await,
        Err(BrokerError::NotAllowed)
    );
    assert_ok!(broker.reserve(&id("def"), None).await);
}
