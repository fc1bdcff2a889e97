//! The BiDi multiplexer: one WebSocket shared by many in-flight commands,
//! with id-correlated replies and topic-based event fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_tungstenite::tokio::ConnectStream;
use async_tungstenite::tungstenite::Message;
use async_tungstenite::WebSocketStream;
use futures::channel::oneshot;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use oxidriver_types::{BidiCommand, BidiMessage, CallId};

use crate::error::{ProtocolError, Result, WebDriverError};

type WsSink = SplitSink<WebSocketStream<ConnectStream>, Message>;
type WsStream = SplitStream<WebSocketStream<ConnectStream>>;

/// Which console messages a handler wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleType {
    All,
    Log,
    Error,
}

/// A console message emitted by the page, decoded from a `log.entryAdded`
/// event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    #[serde(rename = "type")]
    pub kind: ConsoleType,
    pub message: String,
}

impl ConsoleMessage {
    /// Decodes a `log.entryAdded` event payload. Returns `None` for log
    /// entries that did not come from the console API.
    pub fn from_event(params: &Value) -> Option<ConsoleMessage> {
        if params.get("type").and_then(Value::as_str) != Some("console") {
            return None;
        }
        let kind = match params.get("level").and_then(Value::as_str) {
            Some("error") => ConsoleType::Error,
            _ => ConsoleType::Log,
        };
        let message = params
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(ConsoleMessage { kind, message })
    }

    pub fn matches(&self, filter: ConsoleType) -> bool {
        filter == ConsoleType::All || filter == self.kind
    }
}

type EventHandler = Box<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct MuxState {
    pending: HashMap<u64, oneshot::Sender<Result<Value>>>,
    handlers: HashMap<String, Vec<EventHandler>>,
    closed: bool,
}

struct BidiInner {
    sink: tokio::sync::Mutex<WsSink>,
    next_id: AtomicU64,
    state: Mutex<MuxState>,
    session_id: Mutex<Option<String>>,
}

/// A BiDi session over one WebSocket.
///
/// Any number of [`execute`](BidiSession::execute) calls may be in flight
/// concurrently; replies are routed to their callers by id regardless of
/// arrival order. Incoming events are fanned out to the handlers registered
/// for their method.
pub struct BidiSession {
    inner: Arc<BidiInner>,
    reader: JoinHandle<()>,
}

impl BidiSession {
    /// Connects to a BiDi WebSocket endpoint, e.g. the `webSocketUrl`
    /// capability returned at session creation.
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let (ws, _response) = async_tungstenite::tokio::connect_async(url.as_ref()).await?;
        tracing::debug!(url = url.as_ref(), "bidi socket connected");

        let (sink, stream) = ws.split();
        let inner = Arc::new(BidiInner {
            sink: tokio::sync::Mutex::new(sink),
            next_id: AtomicU64::new(1),
            state: Mutex::new(MuxState::default()),
            session_id: Mutex::new(None),
        });

        let reader = tokio::spawn(read_loop(stream, Arc::clone(&inner)));
        Ok(BidiSession { inner, reader })
    }

    /// Scopes subsequent commands to a remote session id.
    pub fn set_session_id(&self, session_id: impl Into<String>) {
        *self.inner.session_id.lock().expect("bidi session id poisoned") =
            Some(session_id.into());
    }

    /// Sends one command frame and awaits the matching response.
    ///
    /// Fails fast with [`WebDriverError::SessionClosed`] once the session
    /// has been closed; pending calls are released with the same error when
    /// the session closes underneath them. Dropping the returned future
    /// deregisters the in-flight slot.
    pub async fn execute(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let (id, rx) = {
            let mut state = self.inner.state.lock().expect("bidi state poisoned");
            if state.closed {
                return Err(WebDriverError::SessionClosed);
            }
            let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = oneshot::channel();
            state.pending.insert(id, tx);
            (id, rx)
        };
        let mut guard = PendingGuard {
            inner: Arc::clone(&self.inner),
            id,
            armed: true,
        };

        let session_id = self
            .inner
            .session_id
            .lock()
            .expect("bidi session id poisoned")
            .clone();
        let frame = BidiCommand {
            id: CallId::new(id),
            method,
            params: params.as_ref(),
            session_id: session_id.as_deref(),
        };
        let text = serde_json::to_string(&frame)?;
        tracing::trace!(%text, "bidi send");

        if let Err(err) = self
            .inner
            .sink
            .lock()
            .await
            .send(Message::Text(text))
            .await
        {
            return Err(err.into());
        }

        let result = match rx.await {
            Ok(result) => result,
            // The sender was dropped without a reply: the session closed.
            Err(_) => Err(WebDriverError::SessionClosed),
        };
        guard.armed = false;
        result
    }

    /// Registers a handler for an event topic (the frame's `method`).
    ///
    /// Handlers run synchronously on the reader task, in arrival order, and
    /// must not block; a blocking handler stalls the whole socket.
    pub fn on_event(
        &self,
        method: impl Into<String>,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) {
        let mut state = self.inner.state.lock().expect("bidi state poisoned");
        state
            .handlers
            .entry(method.into())
            .or_default()
            .push(Box::new(handler));
    }

    /// Drops every handler registered for a topic.
    pub fn remove_event_handlers(&self, method: &str) {
        let mut state = self.inner.state.lock().expect("bidi state poisoned");
        state.handlers.remove(method);
    }

    /// Registers a handler for page console messages, decoded from
    /// `log.entryAdded` events and filtered by level. The remote end must
    /// also be subscribed to the event, e.g. via
    /// [`subscribe`](BidiSession::subscribe)`(&["log.entryAdded"])`.
    pub fn on_console_message(
        &self,
        filter: ConsoleType,
        handler: impl Fn(ConsoleMessage) + Send + Sync + 'static,
    ) {
        self.on_event("log.entryAdded", move |params| {
            if let Some(message) = ConsoleMessage::from_event(params) {
                if message.matches(filter) {
                    handler(message);
                }
            }
        });
    }

    /// Asks the remote end to start emitting the given events, e.g.
    /// `["log.entryAdded"]`.
    pub async fn subscribe(&self, events: &[&str]) -> Result<Value> {
        self.execute("session.subscribe", Some(json!({"events": events})))
            .await
    }

    pub async fn unsubscribe(&self, events: &[&str]) -> Result<Value> {
        self.execute("session.unsubscribe", Some(json!({"events": events})))
            .await
    }

    /// Evaluates a script expression in the given realm target.
    pub async fn evaluate_script(&self, expression: &str, target: Value) -> Result<Value> {
        self.execute(
            "script.evaluate",
            Some(json!({
                "expression": expression,
                "target": target,
                "awaitPromise": true,
            })),
        )
        .await
    }

    /// Calls a function declaration in the given realm target.
    pub async fn call_function(
        &self,
        function_declaration: &str,
        arguments: Vec<Value>,
        target: Value,
    ) -> Result<Value> {
        self.execute(
            "script.callFunction",
            Some(json!({
                "functionDeclaration": function_declaration,
                "arguments": arguments,
                "target": target,
                "awaitPromise": true,
            })),
        )
        .await
    }

    /// Whether [`close`](BidiSession::close) has run (or the socket died).
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().expect("bidi state poisoned").closed
    }

    /// Closes the session: every pending call is released with
    /// [`WebDriverError::SessionClosed`], the handler table is cleared, and
    /// the socket is shut down. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if !close_channels(&self.inner) {
            return Ok(());
        }
        let _ = self.inner.sink.lock().await.close().await;
        Ok(())
    }
}

impl Drop for BidiSession {
    fn drop(&mut self) {
        close_channels(&self.inner);
        self.reader.abort();
    }
}

impl std::fmt::Debug for BidiSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BidiSession")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Marks the session closed and unblocks every waiter. Returns false when
/// the session was closed already.
fn close_channels(inner: &BidiInner) -> bool {
    let mut state = inner.state.lock().expect("bidi state poisoned");
    if state.closed {
        return false;
    }
    state.closed = true;
    // Dropping the senders wakes every pending call with SessionClosed.
    state.pending.clear();
    state.handlers.clear();
    true
}

struct PendingGuard {
    inner: Arc<BidiInner>,
    id: u64,
    armed: bool,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.inner.state.lock().expect("bidi state poisoned");
            state.pending.remove(&self.id);
        }
    }
}

async fn read_loop(mut stream: WsStream, inner: Arc<BidiInner>) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                tracing::trace!(%text, "bidi recv");
                match serde_json::from_str::<BidiMessage>(&text) {
                    Ok(BidiMessage::Response(response)) => {
                        let sender = {
                            let mut state = inner.state.lock().expect("bidi state poisoned");
                            state.pending.remove(&response.id.inner())
                        };
                        let Some(sender) = sender else {
                            tracing::warn!(id = response.id.inner(), "reply for unknown call");
                            continue;
                        };
                        let result = match response.wire_error() {
                            Some(wire) => Err(ProtocolError::new(wire, 0).into()),
                            None => Ok(response.result.unwrap_or(Value::Null)),
                        };
                        let _ = sender.send(result);
                    }
                    Ok(BidiMessage::Event(event)) => {
                        let state = inner.state.lock().expect("bidi state poisoned");
                        if let Some(handlers) = state.handlers.get(&event.method) {
                            for handler in handlers {
                                handler(&event.params);
                            }
                        }
                    }
                    Err(err) => {
                        tracing::error!(%err, "failed to parse bidi frame");
                    }
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            // pings are answered by the protocol layer; nothing to route
            Ok(_) => {}
        }
    }
    close_channels(&inner);
    tracing::debug!("bidi reader finished");
}
