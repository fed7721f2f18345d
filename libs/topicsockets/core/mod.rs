//! Core channel machinery: the client itself, its type-state builder,
//! connection state tracking, the topic registry and liveness checks.

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod liveness;
pub mod registry;

// Re-export main types
pub use builder::{states, ChannelClientBuilder};
pub use client::{ChannelClient, ChannelEvent, Subscription};
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, MetricsSnapshot};
pub use liveness::LivenessTracker;
pub use registry::{ListenerId, TopicRegistry};

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new channel client builder
///
/// This is a convenience function for starting the builder pattern.
///
/// # Example
/// ```ignore
/// let client = topicsockets::builder()
///     .url("ws://localhost:8080/ws")
///     .heartbeat(Duration::from_secs(4))
///     .build();
/// ```
pub fn builder() -> ChannelClientBuilder<builder::states::NoUrl> {
    ChannelClientBuilder::new()
}
