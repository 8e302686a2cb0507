use super::messages::{Envelope, EVENT_ERROR};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use tungstenite::Message;

/// Lifecycle state of the connection, mutated only by the driver task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

/// Bounded fixed-delay retry policy
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts before giving up
    pub max_attempts: u32,
    /// Delay between attempts
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

type EventHandler = Box<dyn Fn(serde_json::Value) + Send + Sync>;

/// Owns the persistent duplex WebSocket to the analysis service.
///
/// Created once and reused across session start/stop cycles. One JSON
/// envelope `{event, data}` travels per text message in both directions.
/// On connection loss the driver retries with a fixed delay up to the
/// policy's attempt bound, then parks in `Failed` until `connect` is
/// called again.
pub struct ConnectionManager {
    url: String,
    policy: ReconnectPolicy,
    state: Mutex<ConnectionState>,
    handlers: Mutex<HashMap<String, EventHandler>>,
    outbound_tx: Mutex<Option<mpsc::Sender<Envelope>>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
            state: Mutex::new(ConnectionState::Disconnected),
            handlers: Mutex::new(HashMap::new()),
            outbound_tx: Mutex::new(None),
            driver: Mutex::new(None),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(ConnectionState::Failed)
    }

    /// Register the handler for a named inbound event, replacing any
    /// previous handler for that name. Handlers run on the driver task
    /// and receive the envelope's `data` value.
    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(serde_json::Value) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.insert(event.to_string(), Box::new(handler));
        }
    }

    /// Enqueue an outbound event without blocking.
    ///
    /// Dropped (with a debug log) when the connection is not `Connected`;
    /// the frame transport layers its own bounded buffering on top.
    pub fn send(&self, event: &str, data: serde_json::Value) {
        if self.state() != ConnectionState::Connected {
            debug!("dropping outbound {:?} event: connection not ready", event);
            return;
        }

        let tx = match self.outbound_tx.lock() {
            Ok(guard) => guard.as_ref().cloned(),
            Err(_) => None,
        };

        if let Some(tx) = tx {
            let envelope = Envelope {
                event: event.to_string(),
                data,
            };
            if tx.try_send(envelope).is_err() {
                warn!("outbound queue full, dropping {:?} event", event);
            }
        }
    }

    /// Start (or restart after `Failed`) the connection driver task.
    ///
    /// Must be called from within a tokio runtime. A no-op while a driver
    /// is already running.
    pub fn connect(self: &Arc<Self>) {
        let mut driver = match self.driver.lock() {
            Ok(driver) => driver,
            Err(_) => return,
        };

        if driver.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("connect() called while connection driver is already running");
            return;
        }

        let manager = Arc::clone(self);
        *driver = Some(tokio::spawn(async move { manager.run().await }));
    }

    /// Driver loop: connect, pump the socket until the link drops, retry.
    async fn run(self: Arc<Self>) {
        let mut attempts: u32 = 0;
        self.set_state(ConnectionState::Connecting);

        loop {
            match connect_async(self.url.as_str()).await {
                Ok((socket, _)) => {
                    attempts = 0;
                    info!("connected to {}", self.url);

                    let (outbound_tx, outbound_rx) = mpsc::channel(64);
                    if let Ok(mut slot) = self.outbound_tx.lock() {
                        *slot = Some(outbound_tx);
                    }
                    self.set_state(ConnectionState::Connected);

                    self.drive_socket(socket, outbound_rx).await;

                    if let Ok(mut slot) = self.outbound_tx.lock() {
                        *slot = None;
                    }
                    warn!("connection to {} lost", self.url);
                }
                Err(e) => {
                    attempts += 1;
                    warn!(
                        "connection attempt {}/{} failed: {}",
                        attempts, self.policy.max_attempts, e
                    );
                    if attempts >= self.policy.max_attempts {
                        error!(
                            "giving up after {} attempts; call connect() to retry",
                            attempts
                        );
                        self.set_state(ConnectionState::Failed);
                        return;
                    }
                }
            }

            self.set_state(ConnectionState::Reconnecting);
            tokio::time::sleep(self.policy.delay).await;
        }
    }

    /// Pump one established socket until it closes or errors.
    async fn drive_socket(
        &self,
        socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
        mut outbound_rx: mpsc::Receiver<Envelope>,
    ) {
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    let Some(envelope) = outbound else { break };
                    let text = match serde_json::to_string(&envelope) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("failed to serialize {:?} event: {}", envelope.event, e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        warn!("websocket send failed: {}", e);
                        self.dispatch(EVENT_ERROR, json!({ "message": e.to_string() }));
                        break;
                    }
                }
                inbound = stream.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => self.handle_text(&text),
                        Some(Ok(Message::Close(_))) | None => {
                            info!("server closed the connection");
                            break;
                        }
                        // Ping/pong and binary frames carry no events
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("websocket error: {}", e);
                            self.dispatch(EVENT_ERROR, json!({ "message": e.to_string() }));
                            break;
                        }
                    }
                }
            }
        }
    }

    fn handle_text(&self, text: &str) {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => self.dispatch(&envelope.event, envelope.data),
            Err(e) => warn!("ignoring malformed inbound message: {}", e),
        }
    }

    fn dispatch(&self, event: &str, data: serde_json::Value) {
        let handlers = match self.handlers.lock() {
            Ok(handlers) => handlers,
            Err(_) => return,
        };
        match handlers.get(event) {
            Some(handler) => handler(data),
            None => debug!("no handler registered for {:?} event", event),
        }
    }

    fn set_state(&self, next: ConnectionState) {
        if let Ok(mut state) = self.state.lock() {
            if *state != next {
                debug!("connection state: {:?} -> {:?}", *state, next);
                *state = next;
            }
        }
    }
}
