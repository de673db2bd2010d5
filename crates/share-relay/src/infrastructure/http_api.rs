//! Operational HTTP API.
//!
//! The router also carries the WebSocket upgrade, so one port serves both.
//!
//! | Route               | Purpose                                          |
//! |---------------------|--------------------------------------------------|
//! | `GET /`             | Service banner, or WebSocket upgrade if asked    |
//! | `GET /ws`           | WebSocket upgrade                                |
//! | `GET /health`       | Liveness plus connection and session counts      |
//! | `GET /identifiers`  | Diagnostic listing of every session              |
//! | `POST /register`    | Reserve an identifier out of band                |
//! | `POST /unregister`  | Tear a session down and close its connections    |
//!
//! Broker errors map to status codes through [`status_for`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use share_core::{BrokerError, Identifier, SessionState, SessionSummary};
use tracing::warn;

use crate::application::broker::Broker;
use crate::infrastructure::hub::ConnectionHub;
use crate::infrastructure::ws_server;

/// Shared state for every handler, WebSocket connections included.
#[derive(Clone)]
pub struct ApiState {
    pub broker: Arc<Broker>,
    pub hub: Arc<ConnectionHub>,
    /// Keepalive period for upgraded connections.
    pub ping_interval: Duration,
    /// Advertised in the banner so clients know where to connect.
    pub port: u16,
}

// ── Request / response bodies ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IdentifierRequest {
    pub identifier: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BannerResponse {
    pub message: String,
    pub status: String,
    pub timestamp: u64,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub server: String,
    pub version: String,
    pub connections: usize,
    pub sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct IdentifiersResponse {
    pub count: usize,
    pub sessions: Vec<SessionSummary>,
}

/// Body of `/register` and `/unregister` responses.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SessionState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiReply {
    fn failure(identifier: Option<String>, err: &BrokerError) -> (StatusCode, Json<Self>) {
        (
            status_for(err),
            Json(Self {
                success: false,
                identifier,
                error: Some(err.code().to_string()),
                message: Some(err.to_string()),
                ..Self::default()
            }),
        )
    }
}

/// HTTP status for a broker error.
pub fn status_for(err: &BrokerError) -> StatusCode {
    match err {
        BrokerError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
        BrokerError::NotAllowed | BrokerError::NotJoined => StatusCode::FORBIDDEN,
        BrokerError::NotRegistered => StatusCode::NOT_FOUND,
        BrokerError::AlreadyReserved
        | BrokerError::AlreadyPaired
        | BrokerError::AlreadyBound
        | BrokerError::NoPeer => StatusCode::CONFLICT,
        BrokerError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Every route the relay serves.  [`ws_server::serve`] mounts it on the
/// listener.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ws", get(ws_server::ws_handler))
        .route("/health", get(health))
        .route("/identifiers", get(identifiers))
        .route("/register", post(register))
        .route("/unregister", post(unregister))
        .with_state(state)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /`: endpoints that ask for a WebSocket get one, anything else gets
/// the banner.
pub async fn root(
    ws: Option<WebSocketUpgrade>,
    connect: Option<ConnectInfo<SocketAddr>>,
    State(state): State<ApiState>,
) -> Response {
    match ws {
        Some(ws) => ws_server::upgrade(ws, ws_server::peer_addr(connect), state),
        None => banner(State(state)).await.into_response(),
    }
}

pub async fn banner(State(state): State<ApiState>) -> Json<BannerResponse> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    Json(BannerResponse {
        message: "Alpha Share relay is running".to_string(),
        status: "OK".to_string(),
        timestamp,
        port: state.port,
    })
}

pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        server: "share-relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.hub.len(),
        sessions: state.broker.session_count(),
    })
}

pub async fn identifiers(State(state): State<ApiState>) -> Json<IdentifiersResponse> {
    let sessions = state.broker.sessions();
    Json(IdentifiersResponse {
        count: sessions.len(),
        sessions,
    })
}

pub async fn register(
    State(state): State<ApiState>,
    Json(req): Json<IdentifierRequest>,
) -> (StatusCode, Json<ApiReply>) {
    let identifier = match Identifier::parse(&req.identifier) {
        Ok(id) => id,
        Err(e) => return ApiReply::failure(None, &e),
    };
    match state.broker.reserve(&identifier, None).await {
        Ok(session_state) => (
            StatusCode::OK,
            Json(ApiReply {
                success: true,
                identifier: Some(identifier.to_string()),
                state: Some(session_state),
                ..ApiReply::default()
            }),
        ),
        Err(e) => {
            warn!(%identifier, "HTTP register rejected: {e}");
            ApiReply::failure(Some(identifier.to_string()), &e)
        }
    }
}

pub async fn unregister(
    State(state): State<ApiState>,
    Json(req): Json<IdentifierRequest>,
) -> (StatusCode, Json<ApiReply>) {
    let identifier = match Identifier::parse(&req.identifier) {
        Ok(id) => id,
        Err(e) => return ApiReply::failure(None, &e),
    };
    match state.broker.unregister(&identifier) {
        Ok(closed) => (
            StatusCode::OK,
            Json(ApiReply {
                success: true,
                identifier: Some(identifier.to_string()),
                closed: Some(closed),
                ..ApiReply::default()
            }),
        ),
        Err(e) => ApiReply::failure(Some(identifier.to_string()), &e),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
