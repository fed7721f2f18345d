//! Data model for the Who Is The Spy game
//!
//! Mirrors the backend's wire representation: camelCase field names,
//! UUIDs as strings and a SCREAMING_SNAKE_CASE game state.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A registered player account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: Option<NaiveDateTime>,
}

/// Lifecycle of a game room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    Waiting,
    Running,
    Finished,
}

/// One game room as the backend reports it
///
/// `players` holds user ids in join order; `spy_user_ids`, the words and
/// the spy count are only present once the host has started the game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub join_code: String,
    pub host_user_id: String,
    #[serde(default)]
    pub players: Vec<String>,
    pub number_of_spies: Option<u32>,
    pub spy_user_ids: Option<Vec<String>>,
    #[serde(default)]
    pub current_turn_index: u32,
    pub civilian_word: Option<String>,
    pub spy_word: Option<String>,
    pub current_image_url: Option<String>,
    pub game_state: GameState,
}

impl Game {
    /// Id of the player whose turn it is, in join order
    ///
    /// The turn index counts up forever; it wraps over the player list.
    pub fn current_player(&self) -> Option<&str> {
        if self.players.is_empty() {
            return None;
        }
        let index = self.current_turn_index as usize % self.players.len();
        self.players.get(index).map(String::as_str)
    }

    pub fn is_host(&self, user_id: &str) -> bool {
        self.host_user_id == user_id
    }

    pub fn is_spy(&self, user_id: &str) -> bool {
        self.spy_user_ids
            .as_ref()
            .map(|ids| ids.iter().any(|id| id == user_id))
            .unwrap_or(false)
    }

    /// The secret word this player should see, once the game is running
    pub fn word_for(&self, user_id: &str) -> Option<&str> {
        if self.is_spy(user_id) {
            self.spy_word.as_deref()
        } else {
            self.civilian_word.as_deref()
        }
    }

    pub fn is_running(&self) -> bool {
        self.game_state == GameState::Running
    }
}

/// Payload pushed on `game/{id}/turn` when the host advances the turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TurnUpdate {
    pub current_turn_index: u32,
}

/// Payload pushed on `game/{id}/image` when a new image is generated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpdate {
    pub image_url: String,
    pub game_id: Option<String>,
}

/// Payload pushed on `game/{id}/players` when the lobby changes
///
/// A plain join or create carries only `players`; a game start also
/// carries the new state and the spy count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayersUpdate {
    #[serde(default)]
    pub players: Vec<String>,
    pub game_state: Option<GameState>,
    pub number_of_spies: Option<u32>,
}
