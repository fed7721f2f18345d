//! # TopicSockets
//!
//! A topic-multiplexed WebSocket channel client for realtime push updates.
//!
//! ## Features
//!
//! - **One connection, many topics**: A single socket carries every
//!   subscription, opened and released as listeners come and go
//! - **Type-state builder**: Compile-time guarantees for required configuration
//! - **Ordered fan-out**: Listeners on a topic fire in registration order,
//!   isolated from each other's panics and from undecodable frames
//! - **Automatic reconnection**: Pluggable backoff strategies with the full
//!   active-topic set replayed on every fresh connection
//! - **Injectable**: The client is a plain value with no global state;
//!   construct as many as you need and hand them to whoever owns them
//!
//! ## Example
//!
//! ```rust,ignore
//! use topicsockets::{ChannelClient, FixedDelay, Result};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ChannelClient::builder()
//!         .url("ws://localhost:8080/ws")
//!         .heartbeat(Duration::from_secs(4))
//!         .reconnect_strategy(FixedDelay::new(Duration::from_secs(5), None))
//!         .build();
//!
//!     client.connect().await?;
//!
//!     let subscription = client.subscribe("game/42/turn", |payload| {
//!         println!("turn update: {payload}");
//!     })?;
//!
//!     // ... play the game ...
//!
//!     subscription.unsubscribe();
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod protocol;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    builder, client, config, connection_state, liveness, registry,
    builder::{states, ChannelClientBuilder},
    client::{ChannelClient, ChannelEvent, Subscription},
    config::ClientConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, MetricsSnapshot},
    registry::{ListenerId, TopicRegistry},
};

// Re-export the wire protocol frames
pub use protocol::{ClientFrame, ServerFrame, PROTOCOL_VERSION};

// Convenience function
pub use core::builder as client_builder;

/// Type alias for Result with ChannelError
pub type Result<T> = std::result::Result<T, traits::ChannelError>;
