//! Runtime settings for the game client
//!
//! Read once from the environment at startup; a `.env` file in the
//! working directory is honored the same way the server side does it.

use std::env;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";

/// Endpoint configuration for both the REST API and the push channel
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the REST API, no trailing slash
    pub api_url: String,
    /// WebSocket endpoint for the live-update channel
    pub ws_url: String,
}

impl Settings {
    /// Load settings from `API_URL` / `WS_URL`, defaulting to a local
    /// server on port 8080
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            api_url: env::var("API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            ws_url: env::var("WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string()),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_localhost() {
        let settings = Settings::default();
        assert_eq!(settings.api_url, "http://localhost:8080/api");
        assert_eq!(settings.ws_url, "ws://localhost:8080/ws");
    }
}
