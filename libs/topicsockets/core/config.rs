use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Bound on dial plus handshake for a single connection attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay used by the default reconnection strategy
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Configuration for a ChannelClient
///
/// Built through the type-state builder; the URL is the only required
/// field. Everything here is fixed for the lifetime of the client.
pub struct ClientConfig {
    /// WebSocket URL (ws:// or wss://)
    pub(crate) url: String,

    /// Optional credential source for the handshake
    pub(crate) auth: Option<Arc<dyn AuthProvider>>,

    /// Upper bound on connect() dial plus handshake
    pub(crate) connect_timeout: Duration,

    /// Backoff policy after a lost connection
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,

    /// Interval between application-level pings, None disables them
    pub(crate) heartbeat: Option<Duration>,

    /// How long a ping may wait for its pong before the connection is
    /// declared dead. Defaults to three heartbeat intervals.
    pub(crate) liveness_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn has_heartbeat(&self) -> bool {
        self.heartbeat.is_some()
    }

    /// Effective pong deadline for the configured heartbeat
    pub fn liveness_deadline(&self) -> Duration {
        self.liveness_timeout
            .or_else(|| self.heartbeat.map(|interval| interval * 3))
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }
}
