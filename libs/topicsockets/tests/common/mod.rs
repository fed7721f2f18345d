//! Common test utilities for TopicSockets integration tests
//!
//! This module provides a mock push server speaking the channel protocol.

use serde_json::Value;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;
use topicsockets::protocol::{ClientFrame, ServerFrame};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Everything the mock server remembers across connections
struct ServerState {
    subscriptions: Mutex<HashSet<String>>,
    clients: Mutex<Vec<mpsc::UnboundedSender<Message>>>,
    reject_handshake: AtomicBool,
    reject_message: Mutex<String>,
    answer_pings: AtomicBool,
    connections_accepted: AtomicUsize,
    subscribe_log: Mutex<Vec<String>>,
    unsubscribe_log: Mutex<Vec<String>>,
    handshake_tokens: Mutex<Vec<Option<String>>>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            subscriptions: Mutex::new(HashSet::new()),
            clients: Mutex::new(Vec::new()),
            reject_handshake: AtomicBool::new(false),
            reject_message: Mutex::new(String::from("handshake rejected")),
            answer_pings: AtomicBool::new(true),
            connections_accepted: AtomicUsize::new(0),
            subscribe_log: Mutex::new(Vec::new()),
            unsubscribe_log: Mutex::new(Vec::new()),
            handshake_tokens: Mutex::new(Vec::new()),
        }
    }

    fn broadcast(&self, message: Message) {
        let mut clients = self.clients.lock().unwrap();
        clients.retain(|tx| tx.send(message.clone()).is_ok());
    }
}

/// A mock push server speaking the channel protocol
///
/// Accepts any number of connections, answers the connect handshake,
/// tracks topic subscriptions and pushes frames to connected clients.
pub struct MockPushServer {
    pub addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: Arc<Notify>,
}

impl MockPushServer {
    /// Create and start a new mock push server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState::new());
        let shutdown = Arc::new(Notify::new());

        let accept_state = Arc::clone(&state);
        let accept_shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let state = Arc::clone(&accept_state);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, state).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = accept_shutdown.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            state,
            shutdown,
        }
    }

    async fn handle_connection(stream: TcpStream, state: Arc<ServerState>) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };
        state.connections_accepted.fetch_add(1, Ordering::SeqCst);

        let (mut write, mut read) = ws_stream.split();

        // protocol handshake: the first text frame must be connect
        let first = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientFrame>(&text)
                {
                    Ok(frame) => break frame,
                    Err(_) => return,
                },
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return,
            }
        };

        match first {
            ClientFrame::Connect { token, .. } => {
                state.handshake_tokens.lock().unwrap().push(token);
            }
            _ => {
                let reply = ServerFrame::Error {
                    message: "expected a connect frame".into(),
                };
                let _ = write.send(Message::Text(reply.to_text().unwrap())).await;
                return;
            }
        }

        if state.reject_handshake.load(Ordering::SeqCst) {
            let reply = ServerFrame::Error {
                message: state.reject_message.lock().unwrap().clone(),
            };
            let _ = write.send(Message::Text(reply.to_text().unwrap())).await;
            return;
        }

        let session = state.connections_accepted.load(Ordering::SeqCst);
        let reply = ServerFrame::Connected {
            session: Some(format!("session-{}", session)),
        };
        if write
            .send(Message::Text(reply.to_text().unwrap()))
            .await
            .is_err()
        {
            return;
        }

        // connected; register for pushes and serve until either side quits
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        state.clients.lock().unwrap().push(out_tx);

        loop {
            tokio::select! {
                outbound = out_rx.recv() => {
                    match outbound {
                        Some(message) => {
                            if write.send(message).await.is_err() {
                                break;
                            }
                        }
                        // sever_connections dropped our sender
                        None => break,
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let frame = match serde_json::from_str::<ClientFrame>(&text) {
                                Ok(frame) => frame,
                                Err(_) => continue,
                            };
                            match frame {
                                ClientFrame::Subscribe { topic } => {
                                    state.subscriptions.lock().unwrap().insert(topic.clone());
                                    state.subscribe_log.lock().unwrap().push(topic);
                                }
                                ClientFrame::Unsubscribe { topic } => {
                                    state.subscriptions.lock().unwrap().remove(&topic);
                                    state.unsubscribe_log.lock().unwrap().push(topic);
                                }
                                ClientFrame::Ping => {
                                    if state.answer_pings.load(Ordering::SeqCst) {
                                        let pong = ServerFrame::Pong.to_text().unwrap();
                                        if write.send(Message::Text(pong)).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                                ClientFrame::Disconnect => break,
                                ClientFrame::Connect { .. } | ClientFrame::Pong => {}
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => break,
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    }
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Push a payload to clients subscribed to `topic`
    pub fn push(&self, topic: &str, payload: Value) {
        if !self.state.subscriptions.lock().unwrap().contains(topic) {
            return;
        }
        self.push_unchecked(topic, payload);
    }

    /// Push a payload without consulting the subscription set
    pub fn push_unchecked(&self, topic: &str, payload: Value) {
        let frame = ServerFrame::message(topic, payload);
        self.state
            .broadcast(Message::Text(frame.to_text().unwrap()));
    }

    /// Push a raw text frame, bypassing the protocol encoder
    pub fn push_raw(&self, text: &str) {
        self.state.broadcast(Message::Text(text.to_string()));
    }

    /// Drop every live connection without a close handshake
    ///
    /// The listener keeps running, so clients that reconnect are served
    /// again.
    pub fn sever_connections(&self) {
        self.state.clients.lock().unwrap().clear();
    }

    /// Reject future handshakes with the given error message
    pub fn set_reject_handshake(&self, message: &str) {
        *self.state.reject_message.lock().unwrap() = message.to_string();
        self.state.reject_handshake.store(true, Ordering::SeqCst);
    }

    /// Control whether protocol pings get a pong back
    pub fn set_answer_pings(&self, answer: bool) {
        self.state.answer_pings.store(answer, Ordering::SeqCst);
    }

    pub fn connections_accepted(&self) -> usize {
        self.state.connections_accepted.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> HashSet<String> {
        self.state.subscriptions.lock().unwrap().clone()
    }

    pub fn subscribe_log(&self) -> Vec<String> {
        self.state.subscribe_log.lock().unwrap().clone()
    }

    pub fn unsubscribe_log(&self) -> Vec<String> {
        self.state.unsubscribe_log.lock().unwrap().clone()
    }

    pub fn handshake_tokens(&self) -> Vec<Option<String>> {
        self.state.handshake_tokens.lock().unwrap().clone()
    }

    /// Shutdown the server and drop every connection
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
        self.sever_connections();
    }
}

impl Drop for MockPushServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
