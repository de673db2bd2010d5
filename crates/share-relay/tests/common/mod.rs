//! Shared helpers for the share-relay integration tests.
//!
//! Each test binary pulls in only what it needs, hence the `dead_code`
//! allowance.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{atomic::AtomicBool, Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use share_core::{BrokerPolicy, ConnectionId, ServerMsg};
use share_relay::application::{
    AllowListSource, AllowListValidator, Broker, CloseReason, SourceError, Transport,
};
use share_relay::infrastructure::{serve, ConnectionHub};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

pub const TTL: Duration = Duration::from_secs(60);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(1);
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// ── Allow-list sources ────────────────────────────────────────────────────────

/// In-memory allow-list whose contents can be swapped mid-test.
#[derive(Default)]
pub struct SwappableSource {
    body: Mutex<String>,
}

impl SwappableSource {
    pub fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: Mutex::new(body.to_string()),
        })
    }

    pub fn set(&self, body: &str) {
        *self.body.lock().unwrap() = body.to_string();
    }
}

#[async_trait]
impl AllowListSource for SwappableSource {
    async fn fetch(&self) -> Result<String, SourceError> {
        Ok(self.body.lock().unwrap().clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Never answers within any sensible timeout.
pub struct StalledSource;

#[async_trait]
impl AllowListSource for StalledSource {
    async fn fetch(&self) -> Result<String, SourceError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }

    fn describe(&self) -> String {
        "stalled".to_string()
    }
}

// ── Recording transport ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ConnectionId, ServerMsg)>>,
    closed: Mutex<Vec<(ConnectionId, CloseReason)>>,
}

impl RecordingTransport {
    pub fn sent_to(&self, conn: ConnectionId) -> Vec<ServerMsg> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == conn)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn closed(&self) -> Vec<(ConnectionId, CloseReason)> {
        self.closed.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, conn: ConnectionId, msg: ServerMsg) -> bool {
        self.sent.lock().unwrap().push((conn, msg));
        true
    }

    fn close(&self, conn: ConnectionId, reason: CloseReason) {
        self.closed.lock().unwrap().push((conn, reason));
    }
}

pub fn broker_with(
    source: Arc<dyn AllowListSource>,
    ttl: Duration,
    policy: BrokerPolicy,
) -> (Broker, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let validator = AllowListValidator::new(source, ttl, FETCH_TIMEOUT);
    let broker = Broker::new(validator, transport.clone(), policy);
    (broker, transport)
}

// ── Live relay harness ────────────────────────────────────────────────────────

/// A relay serving WebSocket and HTTP on one ephemeral loopback port.
pub struct TestRelay {
    pub addr: SocketAddr,
    /// WebSocket endpoint on the dedicated `/ws` path.
    pub ws_url: String,
    /// WebSocket endpoint on the root path.
    pub root_ws_url: String,
    pub http_url: String,
    pub broker: Arc<Broker>,
    pub hub: Arc<ConnectionHub>,
    running: Arc<AtomicBool>,
}

impl TestRelay {
    pub async fn start(allow_list: &str) -> Self {
        let hub = Arc::new(ConnectionHub::new());
        let validator =
            AllowListValidator::new(SwappableSource::new(allow_list), TTL, FETCH_TIMEOUT);
        let broker = Arc::new(Broker::new(validator, hub.clone(), BrokerPolicy::default()));
        let running = Arc::new(AtomicBool::new(true));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(serve(
            listener,
            Duration::from_secs(30),
            broker.clone(),
            hub.clone(),
            running.clone(),
        ));

        Self {
            addr,
            ws_url: format!("ws://{addr}/ws"),
            root_ws_url: format!("ws://{addr}/"),
            http_url: format!("http://{addr}"),
            broker,
            hub,
            running,
        }
    }

    pub fn stop(&self) {
        self.running
            .store(false, std::sync::atomic::Ordering::Relaxed);
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── WebSocket client ──────────────────────────────────────────────────────────

pub struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    pub async fn connect(url: &str) -> Self {
        let (ws, _) = connect_async(url).await.expect("connect to relay");
        Self { ws }
    }

    pub async fn send(&mut self, value: Value) {
        self.ws
            .send(Message::Text(value.to_string()))
            .await
            .expect("send frame");
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string()))
            .await
            .expect("send frame");
    }

    /// Next JSON text frame, skipping keepalive traffic.
    pub async fn recv(&mut self) -> Value {
        loop {
            match self.next_frame().await {
                Message::Text(text) => return serde_json::from_str(&text).expect("valid JSON"),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    /// Waits for the relay's Close frame and returns its reason text.
    pub async fn recv_close_reason(&mut self) -> String {
        loop {
            match self.next_frame().await {
                Message::Close(Some(frame)) => return frame.reason.to_string(),
                Message::Close(None) => return String::new(),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("expected a close frame, got {other:?}"),
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }

    async fn next_frame(&mut self) -> Message {
        tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
            .await
            .expect("frame within timeout")
            .expect("stream still open")
            .expect("frame decodes")
    }
}
