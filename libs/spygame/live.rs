//! Live-update conventions for the game channel
//!
//! The channel core treats topics as opaque strings; this module is
//! where the game's naming convention actually lives, together with the
//! channel construction tuned for the game server's timings.

use crate::config::Settings;
use std::time::Duration;
use topicsockets::{ChannelClient, FixedDelay};

/// Heartbeat interval negotiated with the game server
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(4);

/// Delay between reconnection attempts after a dropped transport
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Topic names for one game's push streams
///
/// `game/{id}/turn` for turn advances, `game/{id}/image` for freshly
/// generated images, `game/{id}/players` for roster and state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameTopics {
    pub turn: String,
    pub image: String,
    pub players: String,
}

impl GameTopics {
    pub fn for_game(game_id: &str) -> Self {
        Self {
            turn: format!("game/{game_id}/turn"),
            image: format!("game/{game_id}/image"),
            players: format!("game/{game_id}/players"),
        }
    }
}

/// Build a channel client pointed at the configured game server
///
/// Reconnects forever on a fixed delay; pages observe outages through
/// the client's event queue and fall back to on-demand re-fetching.
pub fn channel_for(settings: &Settings) -> ChannelClient {
    ChannelClient::builder()
        .url(settings.ws_url.clone())
        .heartbeat(HEARTBEAT_INTERVAL)
        .reconnect_strategy(FixedDelay::new(RECONNECT_DELAY, None))
        .build()
}
