//! Transport channel: the single WebSocket connection to the game server.
//!
//! Owns connect/send/close and maps inbound frames to typed events on the
//! [`EventBus`]. Malformed payloads are logged and dropped; an unexpected
//! close or stream error publishes a synthetic connection-lost event and
//! leaves the channel closed. The session transport never reconnects on
//! its own - the user must re-initiate. (The chat overlay client in
//! [`crate::chat`] is the one that retries, on a fixed delay; the
//! asymmetry is intentional.)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::error::{Error as WsError, ProtocolError};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use rentroyale_protocol::{ClientMessage, ServerEvent};

use crate::bus::{EventBus, SessionEvent};
use crate::error::TransportError;

/// Lifecycle of the one connection this client owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

/// WebSocket client for the Battle Royale server.
pub struct GameServerClient {
    url: Url,
    state: Arc<Mutex<ConnectionState>>,
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<ClientMessage>>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    bus: EventBus,
    /// Set before an intentional close so the read task does not report it
    /// as a lost connection.
    intentional_disconnect: Arc<AtomicBool>,
}

impl GameServerClient {
    pub fn new(url: &str, bus: EventBus) -> Result<Self, TransportError> {
        let url = Url::parse(url).map_err(|source| TransportError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self {
            url,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            tx: Arc::new(Mutex::new(None)),
            tasks: Mutex::new(Vec::new()),
            bus,
            intentional_disconnect: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    /// Open the connection. No-op when already open; resolves once the
    /// WebSocket handshake completes. A close during the handshake is
    /// reported distinctly from a transport that never opened.
    pub async fn connect(&self) -> Result<(), TransportError> {
        if self.state() == ConnectionState::Open {
            return Ok(());
        }
        *lock(&self.state) = ConnectionState::Connecting;
        self.intentional_disconnect.store(false, Ordering::SeqCst);

        let (ws_stream, _) = connect_async(self.url.as_str()).await.map_err(|e| {
            *lock(&self.state) = ConnectionState::Disconnected;
            match e {
                WsError::ConnectionClosed
                | WsError::AlreadyClosed
                | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                    TransportError::ClosedBeforeOpen
                }
                other => TransportError::ConnectFailed(other),
            }
        })?;
        tracing::info!(url = %self.url, "connected to battle royale server");
        *lock(&self.state) = ConnectionState::Open;

        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<ClientMessage>();
        *lock(&self.tx) = Some(tx);

        let write_task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(j) => j,
                    Err(e) => {
                        tracing::error!("failed to serialize outbound message: {e}");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    tracing::error!("failed to send message: {e}");
                    break;
                }
            }
        });

        let bus = self.bus.clone();
        let state = Arc::clone(&self.state);
        let tx_slot = Arc::clone(&self.tx);
        let intentional = Arc::clone(&self.intentional_disconnect);
        let read_task = tokio::spawn(async move {
            let mut unexpected_close = true;
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => bus.dispatch(&SessionEvent::Server(event)),
                        Err(e) => {
                            // Malformed frames never crash the channel.
                            tracing::warn!("dropping malformed server frame: {e}");
                        }
                    },
                    Ok(Message::Close(_)) => {
                        tracing::info!("server closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("websocket error: {e}");
                        break;
                    }
                }
            }
            if intentional.load(Ordering::SeqCst) {
                unexpected_close = false;
            }
            *lock(&state) = ConnectionState::Closed;
            *lock(&tx_slot) = None;
            if unexpected_close {
                bus.dispatch(&SessionEvent::ConnectionLost);
            }
        });

        let mut tasks = lock(&self.tasks);
        tasks.push(write_task);
        tasks.push(read_task);
        Ok(())
    }

    /// Serialize and queue `message` for transmission. A reported no-op
    /// when the connection is not open - callers must not assume delivery.
    pub fn send(&self, message: &ClientMessage) {
        if self.state() != ConnectionState::Open {
            tracing::warn!(state = ?self.state(), "dropping outbound message, connection not open");
            return;
        }
        let sender = lock(&self.tx).clone();
        match sender {
            Some(tx) => {
                if tx.send(message.clone()).is_err() {
                    tracing::warn!("dropping outbound message, writer task stopped");
                }
            }
            None => {
                tracing::warn!("dropping outbound message, connection not open");
            }
        }
    }

    /// Close the connection and clear all bus registrations. Idempotent;
    /// both socket tasks are aborted synchronously so nothing ticks or
    /// dispatches after this returns.
    pub fn disconnect(&self) {
        self.intentional_disconnect.store(true, Ordering::SeqCst);
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
        *lock(&self.tx) = None;
        self.bus.clear();
        *lock(&self.state) = ConnectionState::Closed;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
