use crate::core::connection_state::ConnectionState;
use thiserror::Error;

/// Main error type for topicsockets
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Socket-level failure: unreachable host, refused connection, broken pipe
    #[error("transport error: {0}")]
    Transport(String),

    /// Connection closed unexpectedly
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The server rejected the protocol handshake
    #[error("handshake rejected: {0}")]
    Handshake(String),

    /// An operation that requires a live connection was called without one
    #[error("not connected (state: {state})")]
    NotConnected { state: ConnectionState },

    /// Bounded wait elapsed before the operation completed
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The configured URL could not be parsed or has an unsupported scheme
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Credential preparation failed before the handshake
    #[error("auth error: {0}")]
    Auth(String),

    /// Channel receive error
    #[error("channel receive error: {0}")]
    ChannelReceive(String),

    /// Generic error
    #[error("error: {0}")]
    Other(String),
}

/// Result type for topicsockets operations
pub type Result<T> = std::result::Result<T, ChannelError>;
