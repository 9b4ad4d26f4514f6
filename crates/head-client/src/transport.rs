//! WebSocket transport to one Hydra node.
//!
//! One physical connection, fixed-backoff reconnect on abnormal close, and
//! broadcast fan-out of inbound frames: several in-flight correlated calls
//! share the stream, so every subscriber sees every message.

use crate::error::TransportError;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;

/// Fixed delay before a reconnect attempt
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 1024;
const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What subscribers observe on the shared stream
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Raw text frame from the node
    Message(Arc<str>),
    /// The connection dropped and is being re-established; correlation
    /// state built on the old connection is stale
    Reset,
}

struct Session {
    outbound: mpsc::Sender<String>,
    shutdown: watch::Sender<bool>,
}

struct Inner {
    url: String,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<TransportEvent>,
    session: Mutex<Option<Session>>,
}

/// One duplex connection to a Hydra node
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

impl Transport {
    /// `url` is the node's base URL; `?history=no` is appended so the node
    /// does not replay the full head history on every (re)connect.
    pub fn new(url: impl Into<String>) -> Self {
        let url = ws_url(url.into());
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                url,
                state,
                events,
                session: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to the shared inbound stream
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.inner.events.subscribe()
    }

    /// Open the connection. No-op while already connecting or connected.
    pub fn connect(&self) {
        let mut session = self.inner.session.lock();
        if session.is_some() {
            return;
        }
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *session = Some(Session {
            outbound: outbound_tx,
            shutdown: shutdown_tx,
        });
        self.inner.state.send_replace(ConnectionState::Connecting);
        tokio::spawn(run(self.inner.clone(), outbound_rx, shutdown_rx));
    }

    /// Close the connection with a normal close frame. Idempotent.
    pub fn disconnect(&self) {
        let session = self.inner.session.lock().take();
        if let Some(session) = session {
            let _ = session.shutdown.send(true);
        }
        self.inner.state.send_replace(ConnectionState::Disconnected);
    }

    /// Send a raw payload. Fails unless currently connected.
    pub async fn send(&self, payload: String) -> Result<(), TransportError> {
        if self.state() != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }
        let outbound = {
            let session = self.inner.session.lock();
            session
                .as_ref()
                .map(|s| s.outbound.clone())
                .ok_or(TransportError::NotConnected)?
        };
        outbound
            .send(payload)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// Derive the WebSocket URL the handshake is performed against.
///
/// A bare `ws://host:port` has an empty path; the request line needs `/`
/// before the query string or the server sees `GET ?history=no`.
fn ws_url(base: String) -> String {
    let base = base.replace("http", "ws");
    let has_path = match base.find("://") {
        Some(scheme_end) => base[scheme_end + 3..].contains('/'),
        None => base.contains('/'),
    };
    if has_path {
        format!("{base}?history=no")
    } else {
        format!("{base}/?history=no")
    }
}

/// Outcome of one established connection
enum SessionEnd {
    Shutdown,
    NormalClose,
    Abnormal,
}

async fn run(
    inner: Arc<Inner>,
    mut outbound: mpsc::Receiver<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        let ws = tokio::select! {
            result = connect_async(&inner.url) => result,
            _ = shutdown.changed() => return,
        };

        match ws {
            Ok((stream, _)) => {
                tracing::info!(url = %inner.url, "connected to hydra node");
                inner.state.send_replace(ConnectionState::Connected);
                let end = drive(&inner, stream, &mut outbound, &mut shutdown).await;
                match end {
                    SessionEnd::Shutdown => {
                        inner.state.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                    SessionEnd::NormalClose => {
                        tracing::info!(url = %inner.url, "node closed the connection");
                        inner.session.lock().take();
                        inner.state.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                    SessionEnd::Abnormal => {
                        tracing::warn!(url = %inner.url, "connection lost, reconnecting");
                        inner.state.send_replace(ConnectionState::Connecting);
                        let _ = inner.events.send(TransportEvent::Reset);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(url = %inner.url, error = %e, "connect failed, retrying");
                inner.state.send_replace(ConnectionState::Connecting);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_BACKOFF) => {}
            _ = shutdown.changed() => return,
        }
    }
}

async fn drive(
    inner: &Inner,
    stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    outbound: &mut mpsc::Receiver<String>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let _ = inner.events.send(TransportEvent::Message(text.into()));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    match String::from_utf8(bytes) {
                        Ok(text) => {
                            let _ = inner.events.send(TransportEvent::Message(text.into()));
                        }
                        Err(_) => tracing::debug!("ignoring non-utf8 binary frame"),
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let normal = frame
                        .as_ref()
                        .map(|f| f.code == CloseCode::Normal)
                        .unwrap_or(false);
                    return if normal {
                        SessionEnd::NormalClose
                    } else {
                        SessionEnd::Abnormal
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "websocket error");
                    return SessionEnd::Abnormal;
                }
                None => return SessionEnd::Abnormal,
            },
            payload = outbound.recv() => match payload {
                Some(payload) => {
                    if sink.send(Message::Text(payload)).await.is_err() {
                        return SessionEnd::Abnormal;
                    }
                }
                None => return SessionEnd::Shutdown,
            },
            _ = shutdown.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                return SessionEnd::Shutdown;
            }
        }
    }
}
