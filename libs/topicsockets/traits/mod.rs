//! Core traits and types for the topicsockets channel client.
//!
//! - **AuthProvider**: supply credentials for the handshake
//! - **ReconnectionStrategy**: control backoff after a lost connection

pub mod auth;
pub mod error;
pub mod reconnect;

// Re-export commonly used types
pub use auth::{AuthProvider, NoAuth, StaticToken};
pub use error::{ChannelError, Result};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
