//! In-process CDP double speaking the flattened-session protocol.
//!
//! Answers the commands a page session issues. Every navigation is followed by
//! a `Page.domContentEventFired` for some *other* session before the one for
//! the page's own session, so waiters that ignore `sessionId` finish early.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub const TARGET_ID: &str = "T-PAGE";
pub const SESSION_ID: &str = "S-PAGE";
pub const FOREIGN_SESSION_ID: &str = "S-OTHER";

/// What `Runtime.evaluate` answers with
#[derive(Clone)]
pub enum Evaluation {
    Value(Value),
    Exception(String),
}

#[derive(Clone)]
pub struct Behaviour {
    /// `errorText` carried by the `Page.navigate` reply
    pub navigate_error: Option<String>,
    /// Hold the page's own DOMContentLoaded until [`CdpDouble::fire_dom_content`]
    pub hold_dom_content: bool,
    pub evaluation: Evaluation,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            navigate_error: None,
            hold_dom_content: false,
            evaluation: Evaluation::Value(Value::Null),
        }
    }
}

pub struct CdpDouble {
    addr: SocketAddr,
    methods: Arc<Mutex<Vec<String>>>,
    dom_content: Arc<Notify>,
}

type Sink = Arc<AsyncMutex<SplitSink<WebSocketStream<TcpStream>, Message>>>;

impl CdpDouble {
    pub async fn start(behaviour: Behaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let methods = Arc::new(Mutex::new(Vec::new()));
        let dom_content = Arc::new(Notify::new());

        let (log, gate) = (methods.clone(), dom_content.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, behaviour.clone(), log.clone(), gate.clone()));
            }
        });

        Self {
            addr,
            methods,
            dom_content,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/devtools/browser/double", self.addr.port())
    }

    /// Methods received so far, in arrival order
    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }

    /// Release a held DOMContentLoaded for the page session
    pub fn fire_dom_content(&self) {
        self.dom_content.notify_one();
    }
}

async fn send(sink: &Sink, message: Value) {
    let _ = sink
        .lock()
        .await
        .send(Message::Text(message.to_string()))
        .await;
}

fn dom_content_event(session_id: &str) -> Value {
    json!({
        "method": "Page.domContentEventFired",
        "params": { "timestamp": 1.0 },
        "sessionId": session_id,
    })
}

async fn serve(
    stream: TcpStream,
    behaviour: Behaviour,
    methods: Arc<Mutex<Vec<String>>>,
    dom_content: Arc<Notify>,
) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (sink, mut stream) = ws.split();
    let sink: Sink = Arc::new(AsyncMutex::new(sink));

    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let id = request["id"].clone();
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let session_id = request.get("sessionId").cloned();
        methods.lock().unwrap().push(method.clone());

        let reply = |result: Value| {
            let mut reply = json!({ "id": id, "result": result });
            if let Some(session_id) = &session_id {
                reply["sessionId"] = session_id.clone();
            }
            reply
        };

        match method.as_str() {
            "Target.createTarget" => send(&sink, reply(json!({ "targetId": TARGET_ID }))).await,
            "Target.attachToTarget" => {
                send(&sink, reply(json!({ "sessionId": SESSION_ID }))).await
            }
            "Page.enable" | "Runtime.enable" | "Browser.close" => {
                send(&sink, reply(json!({}))).await
            }
            "Target.closeTarget" => send(&sink, reply(json!({ "success": true }))).await,
            "Page.navigate" => {
                send(&sink, dom_content_event(FOREIGN_SESSION_ID)).await;
                match &behaviour.navigate_error {
                    Some(error_text) => {
                        send(
                            &sink,
                            reply(json!({ "frameId": "F-MAIN", "errorText": error_text })),
                        )
                        .await
                    }
                    None => {
                        send(&sink, reply(json!({ "frameId": "F-MAIN", "loaderId": "L-1" })))
                            .await;
                        let (sink, gate, hold) =
                            (sink.clone(), dom_content.clone(), behaviour.hold_dom_content);
                        tokio::spawn(async move {
                            if hold {
                                gate.notified().await;
                            }
                            send(&sink, dom_content_event(SESSION_ID)).await;
                        });
                    }
                }
            }
            "Runtime.evaluate" => {
                let result = match &behaviour.evaluation {
                    Evaluation::Value(value) => json!({
                        "result": { "type": "object", "value": value }
                    }),
                    Evaluation::Exception(description) => json!({
                        "result": { "type": "object", "subtype": "error" },
                        "exceptionDetails": {
                            "text": "Uncaught",
                            "exception": { "description": description }
                        }
                    }),
                };
                send(&sink, reply(result)).await
            }
            other => {
                let mut error = json!({
                    "id": id,
                    "error": { "code": -32601, "message": format!("'{}' wasn't found", other) }
                });
                if let Some(session_id) = &session_id {
                    error["sessionId"] = session_id.clone();
                }
                send(&sink, error).await
            }
        }
    }
}
