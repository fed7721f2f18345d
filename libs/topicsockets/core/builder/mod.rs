pub mod states;

use crate::client::ChannelClient;
use crate::config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECONNECT_DELAY};
use crate::traits::*;
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for ChannelClient
///
/// The URL is required and enforced by the type system; everything else
/// has a sensible default. The resulting client is a plain value to be
/// handed to whoever owns the connection lifecycle, nothing here is
/// process-global.
///
/// # Example
/// ```ignore
/// let client = topicsockets::builder()
///     .url("ws://localhost:8080/ws")
///     .heartbeat(Duration::from_secs(4))
///     .reconnect_strategy(FixedDelay::new(Duration::from_secs(5), None))
///     .build();
///
/// client.connect().await?;
/// let sub = client.subscribe("game/42/turn", |payload| {
///     println!("turn update: {payload}");
/// })?;
/// ```
pub struct ChannelClientBuilder<U>
where
    U: UrlState,
{
    state: U,
    auth: Option<Arc<dyn AuthProvider>>,
    connect_timeout: Duration,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    heartbeat: Option<Duration>,
    liveness_timeout: Option<Duration>,
}

impl ChannelClientBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            state: NoUrl,
            auth: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect_strategy: None,
            heartbeat: None,
            liveness_timeout: None,
        }
    }

    pub fn url(self, url: impl Into<String>) -> ChannelClientBuilder<HasUrl> {
        ChannelClientBuilder {
            state: HasUrl { url: url.into() },
            auth: self.auth,
            connect_timeout: self.connect_timeout,
            reconnect_strategy: self.reconnect_strategy,
            heartbeat: self.heartbeat,
            liveness_timeout: self.liveness_timeout,
        }
    }
}

impl Default for ChannelClientBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration, available in any state
impl<U> ChannelClientBuilder<U>
where
    U: UrlState,
{
    pub fn auth(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    /// Bound the dial plus handshake of each connection attempt
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Send an application-level ping every `interval`
    ///
    /// A ping left unanswered past the liveness timeout (three intervals
    /// unless overridden) tears the connection down and lets the
    /// reconnection strategy take over.
    pub fn heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = Some(interval);
        self
    }

    /// Override the pong deadline used with `heartbeat`
    pub fn liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = Some(timeout);
        self
    }
}

// Build method, only available once the URL is set
impl ChannelClientBuilder<HasUrl> {
    pub fn build(self) -> ChannelClient {
        let reconnect_strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(FixedDelay::new(DEFAULT_RECONNECT_DELAY, None)));

        let config = ClientConfig {
            url: self.state.url,
            auth: self.auth,
            connect_timeout: self.connect_timeout,
            reconnect_strategy,
            heartbeat: self.heartbeat,
            liveness_timeout: self.liveness_timeout,
        };

        ChannelClient::from_config(config)
    }
}
