use crate::error::Result;
use async_trait::async_trait;

/// Trait for supplying credentials to the handshake
///
/// The token returned here is embedded in the `connect` frame that opens
/// every connection, including reconnections, so expiring credentials can
/// be refreshed on each attempt.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Produce the token for the next handshake
    ///
    /// # Returns
    /// * `Ok(Some(token))` - Attach this token to the `connect` frame
    /// * `Ok(None)` - Connect anonymously
    /// * `Err(ChannelError)` - Credential preparation failed
    async fn token(&self) -> Result<Option<String>>;
}

/// Auth provider for servers that accept anonymous connections
pub struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
    async fn token(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Auth provider holding a fixed token, e.g. a session id minted over HTTP
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AuthProvider for StaticToken {
    async fn token(&self) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}
