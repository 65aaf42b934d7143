//! CDP Client - The Core Communication Layer
//!
//! Design decisions:
//! 1. Single WebSocket per browser connection, page sessions are multiplexed on it
//! 2. Request/response matching via ID, events broadcast to subscribers
//! 3. Fail fast - no retries, no queuing. Let the caller decide.

use dashmap::DashMap;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::protocol::*;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[derive(Error, Debug)]
pub enum CDPError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CDP protocol error: {code} - {message}")]
    Protocol { code: i32, message: String },

    #[error("Connection closed")]
    Closed,

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("JavaScript exception: {0}")]
    Evaluation(String),
}

/// Result type for CDP operations
pub type Result<T> = std::result::Result<T, CDPError>;

/// Event subscriber callback
pub type EventCallback = Arc<dyn Fn(CDPEvent) + Send + Sync>;

/// CDP Client - manages single WebSocket connection to browser
pub struct CDPClient {
    /// Monotonic request ID counter
    next_id: AtomicU64,

    /// Pending requests waiting for responses
    /// Key: request_id, Value: oneshot sender for response
    pending: Arc<DashMap<RequestId, oneshot::Sender<CDPResponse>>>,

    /// Event subscribers
    /// Key: method name (e.g., "Page.domContentEventFired"), Value: callbacks
    subscribers: Arc<DashMap<String, Vec<EventCallback>>>,

    /// WebSocket write half (wrapped for concurrent sending)
    ws_sink: Arc<RwLock<WsSink>>,

    /// Stops the receiver task
    shutdown_tx: mpsc::Sender<()>,

    /// Delay inserted before every command (debugging aid)
    slow_mo: Duration,
}

impl CDPClient {
    /// Connect to Chrome DevTools Protocol endpoint
    pub async fn connect(ws_url: &str) -> Result<Arc<Self>> {
        Self::connect_with_slow_mo(ws_url, Duration::ZERO).await
    }

    /// Connect and delay every outgoing command by `slow_mo`
    pub async fn connect_with_slow_mo(ws_url: &str, slow_mo: Duration) -> Result<Arc<Self>> {
        let (ws_stream, _) = connect_async(ws_url).await?;
        let (sink, mut stream) = ws_stream.split();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let client = Arc::new(Self {
            next_id: AtomicU64::new(1),
            pending: Arc::new(DashMap::new()),
            subscribers: Arc::new(DashMap::new()),
            ws_sink: Arc::new(RwLock::new(sink)),
            shutdown_tx,
            slow_mo,
        });

        // The task holds only the shared maps so dropping the client ends the connection
        let pending = client.pending.clone();
        let subscribers = client.subscribers.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if let Err(e) = dispatch(&pending, &subscribers, &text) {
                                    tracing::error!("Failed to handle message: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::debug!("WebSocket closed");
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::warn!("WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Shutdown signal received");
                        break;
                    }
                }
            }

            // Dropping the senders wakes every waiter with `Closed`
            pending.clear();
            subscribers.clear();
        });

        Ok(client)
    }

    /// Send CDP request and wait for response
    pub async fn send_request(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        session_id: Option<SessionId>,
    ) -> Result<Value> {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CDPRequest {
            id,
            method: method.into(),
            params,
            session_id,
        };
        tracing::trace!(id, method = %request.method, "CDP request");

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let json = serde_json::to_string(&request)?;
        let mut sink = self.ws_sink.write().await;
        if let Err(e) = sink.send(Message::Text(json)).await {
            self.pending.remove(&id);
            return Err(CDPError::WebSocket(e));
        }
        drop(sink); // Release lock immediately

        let response = rx.await.map_err(|_| CDPError::Closed)?;

        if let Some(error) = response.error {
            return Err(CDPError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Subscribe to CDP events
    pub fn subscribe(&self, method: impl Into<String>, callback: EventCallback) {
        let method = method.into();
        self.subscribers
            .entry(method)
            .or_insert_with(Vec::new)
            .push(callback);
    }

    /// Remove a callback previously passed to [`subscribe`](Self::subscribe)
    pub fn unsubscribe(&self, method: &str, callback: &EventCallback) {
        remove_subscriber(&self.subscribers, method, callback);
    }

    /// Number of callbacks registered for `method`
    pub fn subscriber_count(&self, method: &str) -> usize {
        self.subscribers
            .get(method)
            .map(|callbacks| callbacks.len())
            .unwrap_or(0)
    }

    /// Close connection gracefully
    pub async fn close(&self) -> Result<()> {
        let _ = self.shutdown_tx.try_send(());
        let mut sink = self.ws_sink.write().await;
        sink.close().await?;
        Ok(())
    }
}

fn remove_subscriber(
    subscribers: &DashMap<String, Vec<EventCallback>>,
    method: &str,
    callback: &EventCallback,
) {
    subscribers.remove_if_mut(method, |_, callbacks| {
        callbacks.retain(|c| !Arc::ptr_eq(c, callback));
        callbacks.is_empty()
    });
}

/// Route one incoming WebSocket message to its waiter or subscribers
fn dispatch(
    pending: &DashMap<RequestId, oneshot::Sender<CDPResponse>>,
    subscribers: &DashMap<String, Vec<EventCallback>>,
    text: &str,
) -> Result<()> {
    let msg: CDPMessage = serde_json::from_str(text)?;

    match msg {
        CDPMessage::Response(response) => {
            if let Some((_, tx)) = pending.remove(&response.id) {
                let _ = tx.send(response); // Ignore send errors (receiver dropped)
            } else {
                tracing::warn!("Received response for unknown request: {}", response.id);
            }
        }
        CDPMessage::Event(event) => {
            if let Some(callbacks) = subscribers.get(&event.method) {
                for callback in callbacks.value() {
                    callback(event.clone());
                }
            }
        }
    }

    Ok(())
}
