//! Channel client: one WebSocket connection multiplexing topic
//! subscriptions, with fan-out dispatch and automatic reconnection.

use crate::core::builder::{states::NoUrl, ChannelClientBuilder};
use crate::core::config::ClientConfig;
use crate::core::connection_state::{
    AtomicConnectionState, AtomicMetrics, ConnectionState, MetricsSnapshot,
};
use crate::core::liveness::LivenessTracker;
use crate::core::registry::{Listener, ListenerId, TopicRegistry};
use crate::protocol::{ClientFrame, ServerFrame};
use crate::traits::{ChannelError, Result};
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WireMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle events emitted by the channel
///
/// Consumers poll these with `try_recv_event` to notice outages and
/// degrade deliberately instead of waiting on updates that never come.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Connection established and subscriptions active
    Connected,
    /// Connection lost or torn down
    Disconnected,
    /// Reconnection attempt starting (1-indexed within the outage)
    Reconnecting(usize),
    /// Connection-lifecycle failure, also emitted when the server sends
    /// an error frame mid-stream
    Error(String),
}

/// Requests from the client surface into the connection task
enum Command {
    Subscribe(String),
    Unsubscribe(String),
    Shutdown,
}

/// Handle to the currently spawned connection task
struct Link {
    epoch: u64,
    command_tx: mpsc::UnboundedSender<Command>,
    task: tokio::task::JoinHandle<()>,
}

/// State shared between the client surface, subscriptions and the task
struct Shared {
    config: ClientConfig,
    state: AtomicConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    registry: RwLock<TopicRegistry>,
    metrics: AtomicMetrics,
    event_tx: crossbeam_channel::Sender<ChannelEvent>,
    link: Mutex<Option<Link>>,
    epoch: AtomicU64,
}

impl Shared {
    /// Publish `next` unconditionally
    ///
    /// The watch value is authoritative; the atomic cell is refreshed
    /// inside the watch closure so lock-free readers never run ahead of
    /// waiters.
    fn transition(&self, next: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            self.state.set(next);
            *current = next;
            true
        });
    }

    /// Publish `next` only when still in `expected`; reports success
    fn transition_from(&self, expected: ConnectionState, next: ConnectionState) -> bool {
        let mut moved = false;
        self.state_tx.send_if_modified(|current| {
            if *current != expected {
                return false;
            }
            self.state.set(next);
            *current = next;
            moved = true;
            true
        });
        moved
    }

    /// Claim the Disconnected -> Connecting edge; exactly one caller wins
    fn begin_connect(&self) -> bool {
        self.transition_from(ConnectionState::Disconnected, ConnectionState::Connecting)
    }

    /// Move to ShuttingDown from any live state, returning what was seen
    fn begin_shutdown(&self) -> ConnectionState {
        let mut prior = ConnectionState::Disconnected;
        self.state_tx.send_if_modified(|current| {
            prior = *current;
            match *current {
                ConnectionState::Disconnected | ConnectionState::ShuttingDown => false,
                _ => {
                    self.state.set(ConnectionState::ShuttingDown);
                    *current = ConnectionState::ShuttingDown;
                    true
                }
            }
        });
        prior
    }

    fn emit(&self, event: ChannelEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Rolls the claimed Connecting state back to Disconnected when the
/// dialing future is dropped before it settles
///
/// Callers are free to race `connect()` against a timeout or a select
/// arm; without the rollback an abandoned dial would leave the client
/// in Connecting with no attempt left to finish it.
struct DialGuard<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl DialGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for DialGuard<'_> {
    fn drop(&mut self) {
        if self.armed
            && self
                .shared
                .transition_from(ConnectionState::Connecting, ConnectionState::Disconnected)
        {
            debug!("connect cancelled mid-dial; state rolled back");
        }
    }
}

/// WebSocket channel client
///
/// Owns at most one live connection and a registry of topic listeners fed
/// by it. Cheap to construct; nothing happens until `connect()`. Methods
/// take `&self`, so a shared instance (`Arc<ChannelClient>`) can be used
/// from several tasks.
pub struct ChannelClient {
    shared: Arc<Shared>,
    event_rx: crossbeam_channel::Receiver<ChannelEvent>,
}

impl ChannelClient {
    /// Start the type-state builder
    pub fn builder() -> ChannelClientBuilder<NoUrl> {
        ChannelClientBuilder::new()
    }

    pub(crate) fn from_config(config: ClientConfig) -> Self {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let shared = Arc::new(Shared {
            config,
            state: AtomicConnectionState::new(ConnectionState::Disconnected),
            state_tx,
            registry: RwLock::new(TopicRegistry::new()),
            metrics: AtomicMetrics::new(),
            event_tx,
            link: Mutex::new(None),
            epoch: AtomicU64::new(0),
        });
        Self { shared, event_rx }
    }

    /// Open the connection and complete the protocol handshake
    ///
    /// Idempotent: while connected this resolves immediately and reuses
    /// the live connection; while an attempt is in flight it waits for
    /// that attempt and shares its outcome. The dial plus handshake of a
    /// fresh attempt is bounded by the configured connect timeout.
    ///
    /// Failures are distinct: `Transport` or `InvalidUrl` when the socket
    /// cannot be opened, `Handshake` when the server rejects the connect
    /// frame, `Timeout` when the bound elapses.
    ///
    /// Dropping the returned future before it settles abandons the
    /// attempt and returns the client to `Disconnected`; a later
    /// `connect()` starts fresh.
    pub async fn connect(&self) -> Result<()> {
        loop {
            match self.shared.state.get() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting | ConnectionState::Reconnecting => {
                    return self.await_settled().await;
                }
                ConnectionState::ShuttingDown => self.await_teardown().await,
                ConnectionState::Disconnected => {
                    if self.shared.begin_connect() {
                        return self.dial().await;
                    }
                    // lost the race to another caller; re-evaluate
                }
            }
        }
    }

    /// Tear the connection down and drop every registration
    ///
    /// Safe to call in any state; a no-op when already disconnected. No
    /// listener fires after this returns.
    pub async fn disconnect(&self) {
        match self.shared.begin_shutdown() {
            ConnectionState::Disconnected => return,
            ConnectionState::ShuttingDown => {
                // a concurrent disconnect owns the teardown; wait it out
                self.await_teardown().await;
                return;
            }
            _ => {}
        }

        let link = self.shared.link.lock().take();
        if let Some(link) = link {
            let _ = link.command_tx.send(Command::Shutdown);
            let _ = link.task.await;
        }

        self.shared.registry.write().clear();
        self.shared.transition(ConnectionState::Disconnected);
        self.shared.emit(ChannelEvent::Disconnected);
        info!("channel disconnected");
    }

    /// Register a listener for a topic and return its disposer
    ///
    /// Requires a live connection; otherwise fails with `NotConnected`
    /// carrying the observed state. The first listener for a topic opens
    /// the transport-level subscription, later ones share it. Listeners
    /// for one topic run in registration order, each invoked once per
    /// frame with the decoded payload.
    pub fn subscribe<F>(&self, topic: impl Into<String>, listener: F) -> Result<Subscription>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let listener: Listener = Arc::new(listener);

        let (id, first) = {
            let mut registry = self.shared.registry.write();
            // checked under the registry lock: teardown flips the state
            // before clearing, so an entry added here either sees the
            // clear or is rejected, never stranded
            let state = self.shared.state.get();
            if state != ConnectionState::Connected {
                return Err(ChannelError::NotConnected { state });
            }
            registry.add(&topic, listener)
        };

        if first {
            if let Err(e) = self.send_command(Command::Subscribe(topic.clone())) {
                self.shared.registry.write().remove(&topic, id);
                return Err(e);
            }
        }

        debug!(topic = %topic, "listener registered");
        Ok(Subscription {
            shared: Arc::downgrade(&self.shared),
            topic,
            id,
            active: true,
        })
    }

    /// Whether the channel currently has a live, handshaken connection
    ///
    /// Point-in-time answer; never blocks, never fails.
    pub fn is_connected(&self) -> bool {
        self.shared.state.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Non-blocking poll of the lifecycle event queue
    pub fn try_recv_event(&self) -> Option<ChannelEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocking receive of the next lifecycle event
    ///
    /// Blocks the calling thread; meant for a dedicated consumer thread,
    /// not for async tasks.
    pub fn recv_event(&self) -> Result<ChannelEvent> {
        self.event_rx
            .recv()
            .map_err(|e| ChannelError::ChannelReceive(e.to_string()))
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Wait for an in-flight attempt to settle, sharing its outcome
    async fn await_settled(&self) -> Result<()> {
        let mut state_rx = self.shared.state_tx.subscribe();
        loop {
            let state = *state_rx.borrow_and_update();
            match state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Disconnected | ConnectionState::ShuttingDown => {
                    return Err(ChannelError::ConnectionClosed(
                        "connection attempt did not complete".into(),
                    ));
                }
                _ => {}
            }
            if state_rx.changed().await.is_err() {
                return Err(ChannelError::ConnectionClosed("channel dropped".into()));
            }
        }
    }

    /// Wait until a teardown in progress has finished
    async fn await_teardown(&self) {
        let mut state_rx = self.shared.state_tx.subscribe();
        loop {
            if *state_rx.borrow_and_update() != ConnectionState::ShuttingDown {
                return;
            }
            if state_rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Dial, handshake and hand the socket to a fresh connection task
    ///
    /// Runs with the Connecting state already claimed by this caller.
    async fn dial(&self) -> Result<()> {
        info!(url = %self.shared.config.url, "connecting");

        let mut guard = DialGuard {
            shared: self.shared.as_ref(),
            armed: true,
        };

        let socket = match establish(&self.shared).await {
            Ok(socket) => {
                guard.disarm();
                socket
            }
            Err(e) => {
                guard.disarm();
                self.shared
                    .transition_from(ConnectionState::Connecting, ConnectionState::Disconnected);
                self.shared.emit(ChannelEvent::Error(e.to_string()));
                warn!(error = %e, "connect failed");
                return Err(e);
            }
        };

        let epoch = self.shared.epoch.fetch_add(1, Ordering::Relaxed) + 1;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_channel(Arc::clone(&self.shared), socket, command_rx));
        *self.shared.link.lock() = Some(Link {
            epoch,
            command_tx,
            task,
        });

        if !self
            .shared
            .transition_from(ConnectionState::Connecting, ConnectionState::Connected)
        {
            // torn down while we were dialing; withdraw the link if it is
            // still the one we installed
            let link = {
                let mut guard = self.shared.link.lock();
                if guard.as_ref().map(|l| l.epoch) == Some(epoch) {
                    guard.take()
                } else {
                    None
                }
            };
            if let Some(link) = link {
                let _ = link.command_tx.send(Command::Shutdown);
                let _ = link.task.await;
            }
            self.shared
                .transition_from(ConnectionState::Reconnecting, ConnectionState::Disconnected);
            return Err(ChannelError::ConnectionClosed(
                "connection torn down before becoming ready".into(),
            ));
        }

        self.shared.emit(ChannelEvent::Connected);
        info!("channel connected");
        Ok(())
    }

    fn send_command(&self, command: Command) -> Result<()> {
        let link = self.shared.link.lock();
        match link.as_ref() {
            Some(link) if link.command_tx.send(command).is_ok() => Ok(()),
            _ => Err(ChannelError::NotConnected {
                state: self.shared.state.get(),
            }),
        }
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        // stop the connection task; it exits once the command drains
        if let Some(link) = self.shared.link.lock().take() {
            let _ = link.command_tx.send(Command::Shutdown);
        }
    }
}

/// Disposer for one registered listener
///
/// Removes exactly the listener it was returned for, either explicitly
/// through `unsubscribe()` or when dropped. Removal takes effect for every
/// frame dispatched after it returns; a frame already in flight may still
/// reach the listener once. When the last listener for a topic goes away
/// the transport-level subscription is released too.
#[derive(Debug)]
pub struct Subscription {
    shared: Weak<Shared>,
    topic: String,
    id: ListenerId,
    active: bool,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Remove the listener now instead of at drop time
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        let shared = match self.shared.upgrade() {
            Some(shared) => shared,
            None => return,
        };

        let removed = { shared.registry.write().remove(&self.topic, self.id) };
        match removed {
            Some(true) => {
                // last listener gone; release the wire subscription
                if shared.state.is_connected() {
                    let link = shared.link.lock();
                    if let Some(link) = link.as_ref() {
                        let _ = link
                            .command_tx
                            .send(Command::Unsubscribe(self.topic.clone()));
                    }
                }
                debug!(topic = %self.topic, "topic released");
            }
            Some(false) => {
                debug!(topic = %self.topic, "listener removed");
            }
            // already cleared by a disconnect; nothing left to do
            None => {}
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================
// Connection task
// ============================================================

enum LoopExit {
    Shutdown,
    ConnectionLost(String),
}

/// Owns the socket for the lifetime of the client's connection, including
/// reconnection epochs.
async fn run_channel(
    shared: Arc<Shared>,
    socket: Socket,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut socket = socket;
    loop {
        match message_loop(&shared, &mut socket, &mut command_rx).await {
            LoopExit::Shutdown => {
                // best effort goodbye so the server can release state early
                let _ = send_frame(&mut socket, &shared.metrics, &ClientFrame::Disconnect).await;
                let _ = socket.close(None).await;
                debug!("connection task stopped");
                return;
            }
            LoopExit::ConnectionLost(reason) => {
                warn!(reason = %reason, "connection lost");
                shared.emit(ChannelEvent::Disconnected);
                let _ = socket.close(None).await;
                match reconnect_loop(&shared, &mut command_rx).await {
                    Some(fresh) => socket = fresh,
                    None => return,
                }
            }
        }
    }
}

/// Drive one connection epoch: socket frames, surface commands and the
/// heartbeat, until shutdown or the connection dies.
async fn message_loop(
    shared: &Arc<Shared>,
    socket: &mut Socket,
    command_rx: &mut mpsc::UnboundedReceiver<Command>,
) -> LoopExit {
    let liveness = LivenessTracker::new(shared.config.liveness_deadline());
    let mut heartbeat = shared.config.heartbeat.map(|interval| {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker
    });

    loop {
        tokio::select! {
            incoming = socket.next() => {
                match incoming {
                    Some(Ok(message)) => {
                        if let Some(exit) = handle_wire_message(shared, socket, message, &liveness).await {
                            return exit;
                        }
                    }
                    Some(Err(e)) => return LoopExit::ConnectionLost(e.to_string()),
                    None => return LoopExit::ConnectionLost("socket stream ended".into()),
                }
            }
            command = command_rx.recv() => {
                match command {
                    Some(Command::Subscribe(topic)) => {
                        let frame = ClientFrame::Subscribe { topic };
                        if let Err(e) = send_frame(socket, &shared.metrics, &frame).await {
                            return LoopExit::ConnectionLost(e.to_string());
                        }
                    }
                    Some(Command::Unsubscribe(topic)) => {
                        let frame = ClientFrame::Unsubscribe { topic };
                        if let Err(e) = send_frame(socket, &shared.metrics, &frame).await {
                            return LoopExit::ConnectionLost(e.to_string());
                        }
                    }
                    Some(Command::Shutdown) | None => return LoopExit::Shutdown,
                }
            }
            _ = heartbeat_tick(&mut heartbeat) => {
                if !liveness.is_healthy() {
                    return LoopExit::ConnectionLost("server stopped answering pings".into());
                }
                if let Err(e) = send_frame(socket, &shared.metrics, &ClientFrame::Ping).await {
                    return LoopExit::ConnectionLost(e.to_string());
                }
                liveness.record_ping_sent();
            }
        }
    }
}

async fn heartbeat_tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn handle_wire_message(
    shared: &Arc<Shared>,
    socket: &mut Socket,
    message: WireMessage,
    liveness: &LivenessTracker,
) -> Option<LoopExit> {
    match message {
        WireMessage::Text(text) => {
            shared.metrics.increment_received();
            handle_frame(shared, socket, ServerFrame::from_text(&text), liveness).await
        }
        WireMessage::Binary(bytes) => {
            shared.metrics.increment_received();
            handle_frame(shared, socket, ServerFrame::from_bytes(&bytes), liveness).await
        }
        WireMessage::Close(frame) => {
            let reason = frame.map(|f| f.reason.into_owned()).unwrap_or_default();
            Some(LoopExit::ConnectionLost(format!(
                "server closed the connection: {reason}"
            )))
        }
        // websocket-level ping/pong is answered by the transport
        WireMessage::Ping(_) | WireMessage::Pong(_) | WireMessage::Frame(_) => None,
    }
}

async fn handle_frame(
    shared: &Arc<Shared>,
    socket: &mut Socket,
    decoded: serde_json::Result<ServerFrame>,
    liveness: &LivenessTracker,
) -> Option<LoopExit> {
    let frame = match decoded {
        Ok(frame) => frame,
        Err(e) => {
            // one bad frame never takes the connection down
            shared.metrics.increment_decode_errors();
            warn!(error = %e, "dropping undecodable frame");
            return None;
        }
    };

    match frame {
        ServerFrame::Message { topic, payload } => {
            dispatch(shared, &topic, payload);
            None
        }
        ServerFrame::Ping => {
            if let Err(e) = send_frame(socket, &shared.metrics, &ClientFrame::Pong).await {
                return Some(LoopExit::ConnectionLost(e.to_string()));
            }
            None
        }
        ServerFrame::Pong => {
            liveness.record_pong_seen();
            None
        }
        ServerFrame::Error { message } => {
            warn!(message = %message, "server reported an error");
            shared.emit(ChannelEvent::Error(message));
            None
        }
        ServerFrame::Connected { .. } => {
            debug!("ignoring duplicate connected frame");
            None
        }
    }
}

/// Fan a payload out to the topic's listeners in registration order
///
/// Works from a snapshot so the registry lock is not held while listeners
/// run. Each listener gets its own copy of the payload and a panic in one
/// never reaches its siblings.
fn dispatch(shared: &Shared, topic: &str, payload: Value) {
    let listeners = shared.registry.read().snapshot(topic);
    if listeners.is_empty() {
        debug!(topic = %topic, "frame for topic without listeners");
        return;
    }

    for listener in listeners {
        let value = payload.clone();
        if panic::catch_unwind(panic::AssertUnwindSafe(|| listener(value))).is_err() {
            error!(topic = %topic, "listener panicked while handling a frame");
        }
    }
}

/// Backoff-and-redial loop after a lost connection
///
/// Returns the fresh socket with all active topics already replayed, or
/// None when the strategy gives up or a shutdown arrives mid-outage.
async fn reconnect_loop(
    shared: &Arc<Shared>,
    command_rx: &mut mpsc::UnboundedReceiver<Command>,
) -> Option<Socket> {
    let entered = shared.transition_from(ConnectionState::Connected, ConnectionState::Reconnecting)
        || shared.transition_from(ConnectionState::Connecting, ConnectionState::Reconnecting);
    if !entered {
        // teardown already owns the state
        return None;
    }

    let mut attempt = 0usize;
    loop {
        let delay = match shared.config.reconnect_strategy.next_delay(attempt) {
            Some(delay) => delay,
            None => {
                error!(attempts = attempt, "reconnection attempts exhausted");
                shared.registry.write().clear();
                shared.transition_from(
                    ConnectionState::Reconnecting,
                    ConnectionState::Disconnected,
                );
                shared.emit(ChannelEvent::Error(
                    "reconnection attempts exhausted".into(),
                ));
                return None;
            }
        };

        shared.emit(ChannelEvent::Reconnecting(attempt + 1));
        info!(
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "reconnecting after delay"
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                command = command_rx.recv() => match command {
                    Some(Command::Shutdown) | None => return None,
                    // registry already reflects the change; replay covers it
                    Some(_) => {}
                }
            }
        }

        match establish(shared).await {
            Ok(mut socket) => match replay_subscriptions(shared, &mut socket).await {
                Ok(()) => {
                    if !shared.transition_from(
                        ConnectionState::Reconnecting,
                        ConnectionState::Connected,
                    ) {
                        // torn down while we were re-establishing
                        let _ = socket.close(None).await;
                        return None;
                    }
                    shared.metrics.increment_reconnects();
                    shared.emit(ChannelEvent::Connected);
                    info!("reconnected");
                    return Some(socket);
                }
                Err(e) => {
                    warn!(error = %e, "connection dropped while replaying subscriptions");
                    attempt += 1;
                }
            },
            Err(e) => {
                warn!(attempt = attempt + 1, error = %e, "reconnect attempt failed");
                shared.emit(ChannelEvent::Error(e.to_string()));
                attempt += 1;
            }
        }
    }
}

/// Re-subscribe every active topic on a fresh connection
///
/// The registry is the source of truth: listeners keep their tokens and
/// never have to re-register across reconnects.
async fn replay_subscriptions(shared: &Shared, socket: &mut Socket) -> Result<()> {
    let topics = shared.registry.read().topics();
    for topic in topics {
        let frame = ClientFrame::Subscribe {
            topic: topic.clone(),
        };
        send_frame(socket, &shared.metrics, &frame).await?;
        debug!(topic = %topic, "subscription replayed");
    }
    Ok(())
}

/// Dial and handshake under the configured time bound
async fn establish(shared: &Shared) -> Result<Socket> {
    let timeout = shared.config.connect_timeout;
    match tokio::time::timeout(timeout, open_and_handshake(shared)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ChannelError::Timeout(format!(
            "no handshake within {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Open the socket, send the connect frame and wait for the verdict
async fn open_and_handshake(shared: &Shared) -> Result<Socket> {
    let (mut socket, _response) = connect_async(shared.config.url.as_str())
        .await
        .map_err(map_ws_error)?;

    let token = match &shared.config.auth {
        Some(provider) => provider.token().await?,
        None => None,
    };
    send_frame(&mut socket, &shared.metrics, &ClientFrame::connect(token)).await?;

    while let Some(message) = socket.next().await {
        let message = message.map_err(|e| ChannelError::Transport(e.to_string()))?;
        let raw = match message {
            WireMessage::Text(text) => text,
            WireMessage::Close(_) => {
                return Err(ChannelError::ConnectionClosed(
                    "connection closed during handshake".into(),
                ))
            }
            // websocket control frames are not a handshake verdict
            _ => continue,
        };

        let frame = ServerFrame::from_text(&raw)
            .map_err(|e| ChannelError::Handshake(format!("malformed handshake reply: {e}")))?;
        shared.metrics.increment_received();
        return match frame {
            ServerFrame::Connected { session } => {
                debug!(session = ?session, "handshake accepted");
                Ok(socket)
            }
            ServerFrame::Error { message } => Err(ChannelError::Handshake(message)),
            other => Err(ChannelError::Handshake(format!(
                "expected connected, got {other:?}"
            ))),
        };
    }

    Err(ChannelError::ConnectionClosed(
        "socket ended during handshake".into(),
    ))
}

async fn send_frame(
    socket: &mut Socket,
    metrics: &AtomicMetrics,
    frame: &ClientFrame,
) -> Result<()> {
    let text = frame
        .to_text()
        .map_err(|e| ChannelError::Other(format!("frame encode failed: {e}")))?;
    socket
        .send(WireMessage::Text(text))
        .await
        .map_err(|e| ChannelError::Transport(e.to_string()))?;
    metrics.increment_sent();
    Ok(())
}

fn map_ws_error(e: tokio_tungstenite::tungstenite::Error) -> ChannelError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match e {
        WsError::Url(inner) => ChannelError::InvalidUrl(inner.to_string()),
        other => ChannelError::Transport(other.to_string()),
    }
}
