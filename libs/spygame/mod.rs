//! # SpyGame
//!
//! Client-side domain crate for the Who Is The Spy party game: typed
//! models, the REST client for the game server, the live-update topic
//! conventions and channel wiring, plus logging and shutdown utilities
//! for the executables.
//!
//! The realtime channel itself lives in `topicsockets`; this crate only
//! decides which topics to subscribe and what the payloads mean.

pub mod api;
pub mod config;
pub mod live;
pub mod types;
pub mod utils;

pub use api::{ApiError, GameApi, UserApi};
pub use config::Settings;
pub use live::{channel_for, GameTopics};
pub use types::{Game, GameState, ImageUpdate, PlayersUpdate, TurnUpdate, User};
pub use utils::{init_tracing, ShutdownManager};
