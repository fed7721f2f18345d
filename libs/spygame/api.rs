//! REST client for the game server
//!
//! Plain request/response glue over one `reqwest::Client`: every call
//! maps to a single endpoint, checks the status, then decodes the typed
//! body. Failed calls are not retried; callers decide what a failure
//! means for their view.

use crate::types::{Game, User};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("deserialization failed: {0}")]
    DeserializeFailed(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Error body shape the backend uses for rejected requests
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Response body of the image generation endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub image_url: String,
}

fn build_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client")
}

/// Turn a non-success response into `ApiError::Server`
///
/// The backend wraps rejection reasons in `{"message": ...}`; anything
/// else is passed through raw.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);
    Err(ApiError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| ApiError::DeserializeFailed(e.to_string()))
}

/// Client for the `/users` endpoints
pub struct UserApi {
    base_url: String,
    client: Client,
}

impl UserApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, build_client())
    }

    /// Share an existing HTTP client instead of building a new pool
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub async fn create(&self, username: &str) -> Result<User> {
        let url = format!("{}/users", self.base_url);
        debug!(%url, username, "creating user");
        let response = self
            .client
            .post(&url)
            .json(&json!({ "username": username }))
            .send()
            .await?;
        decode(check(response).await?).await
    }

    pub async fn get(&self, id: &str) -> Result<User> {
        let url = format!("{}/users/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;
        decode(check(response).await?).await
    }

    pub async fn update(&self, id: &str, username: &str) -> Result<User> {
        let url = format!("{}/users/{}", self.base_url, id);
        let response = self
            .client
            .put(&url)
            .json(&json!({ "username": username }))
            .send()
            .await?;
        decode(check(response).await?).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = format!("{}/users/{}", self.base_url, id);
        let response = self.client.delete(&url).send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Client for the `/game` endpoints
pub struct GameApi {
    base_url: String,
    client: Client,
}

impl GameApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, build_client())
    }

    /// Share an existing HTTP client instead of building a new pool
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Create a game room hosted by `host_user_id`
    pub async fn create(&self, host_user_id: &str) -> Result<Game> {
        let url = format!("{}/game/create", self.base_url);
        debug!(%url, host_user_id, "creating game");
        let response = self
            .client
            .post(&url)
            .json(&json!({ "hostUserId": host_user_id }))
            .send()
            .await?;
        decode(check(response).await?).await
    }

    /// Join an existing game by its code
    pub async fn join(&self, join_code: &str, user_id: &str) -> Result<Game> {
        let url = format!("{}/game/join", self.base_url);
        debug!(%url, join_code, "joining game");
        let response = self
            .client
            .post(&url)
            .json(&json!({ "joinCode": join_code, "userId": user_id }))
            .send()
            .await?;
        decode(check(response).await?).await
    }

    /// Start the game; host only
    pub async fn start(
        &self,
        game_id: &str,
        host_user_id: &str,
        number_of_spies: u32,
    ) -> Result<Game> {
        let url = format!("{}/game/start", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "gameId": game_id,
                "hostUserId": host_user_id,
                "numberOfSpies": number_of_spies,
            }))
            .send()
            .await?;
        decode(check(response).await?).await
    }

    /// Fetch the full current game state
    pub async fn get(&self, game_id: &str) -> Result<Game> {
        let url = format!("{}/game/{}", self.base_url, game_id);
        let response = self.client.get(&url).send().await?;
        decode(check(response).await?).await
    }

    /// Advance to the next player's turn; host only
    pub async fn next_turn(&self, game_id: &str, host_user_id: &str) -> Result<Game> {
        let url = format!("{}/game/{}/nextTurn", self.base_url, game_id);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "hostUserId": host_user_id }))
            .send()
            .await?;
        decode(check(response).await?).await
    }

    /// Ask the server to generate a fresh image for the current word
    pub async fn generate_image(&self, game_id: &str, host_user_id: &str) -> Result<GeneratedImage> {
        let url = format!("{}/game/{}/generateImage", self.base_url, game_id);
        debug!(%url, "requesting image generation");
        let response = self
            .client
            .post(&url)
            .json(&json!({ "hostUserId": host_user_id }))
            .send()
            .await?;
        decode(check(response).await?).await
    }
}
