//! Join a game by its code and watch it live
//!
//! Subscribes to the game's turn, image and players topics, re-fetches
//! the full game state whenever a notification lands, and prints the
//! view a player would see. Stays usable without the channel: a failed
//! connect degrades to manual refresh on a timer.
//!
//! Usage: watch_game <join-code> <username>

use anyhow::{Context, Result};
use spygame::{channel_for, Game, GameApi, GameTopics, Settings, ShutdownManager, UserApi};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use topicsockets::ChannelEvent;
use tracing::{info, warn};

fn print_view(game: &Game, user_id: &str) {
    println!("----------------------------------------");
    println!("Game {} ({:?})", game.join_code, game.game_state);
    println!("Players: {}", game.players.len());

    if game.is_running() {
        let role = if game.is_spy(user_id) { "SPY" } else { "civilian" };
        println!("Your role: {}", role);
        if let Some(word) = game.word_for(user_id) {
            println!("Your word: {}", word);
        }
        match game.current_player() {
            Some(current) if current == user_id => println!("Turn: yours!"),
            Some(current) => println!("Turn: {}", current),
            None => {}
        }
        if let Some(url) = &game.current_image_url {
            println!("Image: {}", url);
        }
    } else {
        println!("Waiting for the host to start...");
    }
    println!("----------------------------------------");
}

#[tokio::main]
async fn main() -> Result<()> {
    spygame::init_tracing();

    let mut args = std::env::args().skip(1);
    let join_code = args.next().context("usage: watch_game <join-code> <username>")?;
    let username = args.next().context("usage: watch_game <join-code> <username>")?;

    let settings = Settings::from_env();
    let users = UserApi::new(settings.api_url.clone());
    let games = GameApi::new(settings.api_url.clone());

    let user = users.create(&username).await.context("creating user")?;
    let game = games
        .join(&join_code, &user.id)
        .await
        .context("joining game")?;
    info!(game_id = %game.id, "joined game {}", game.join_code);
    print_view(&game, &user.id);

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    // set by listeners, drained by the main loop; pushes only say that
    // something changed, the full state comes from a re-fetch
    let dirty = Arc::new(AtomicBool::new(false));

    let channel = channel_for(&settings);
    let mut subscriptions = Vec::new();
    let mut live = false;

    match channel.connect().await {
        Ok(()) => {
            let topics = GameTopics::for_game(&game.id);

            let flag = Arc::clone(&dirty);
            subscriptions.push(channel.subscribe(topics.turn, move |_payload| {
                flag.store(true, Ordering::Release);
            })?);

            let flag = Arc::clone(&dirty);
            subscriptions.push(channel.subscribe(topics.players, move |_payload| {
                flag.store(true, Ordering::Release);
            })?);

            let flag = Arc::clone(&dirty);
            subscriptions.push(channel.subscribe(topics.image, move |payload| {
                if let Some(url) = payload.get("imageUrl").and_then(|v| v.as_str()) {
                    println!("New image: {}", url);
                }
                flag.store(true, Ordering::Release);
            })?);

            live = true;
            info!("live updates connected");
        }
        Err(e) => {
            warn!(error = %e, "live updates unavailable, refreshing on a timer");
        }
    }

    println!("Watching game {}. Press Ctrl+C to leave.\n", game.join_code);

    let mut ticks_since_refresh = 0u32;
    while shutdown.is_running() {
        while let Some(event) = channel.try_recv_event() {
            match event {
                ChannelEvent::Connected => info!("live updates connected"),
                ChannelEvent::Disconnected => warn!("live updates lost"),
                ChannelEvent::Reconnecting(attempt) => {
                    info!(attempt, "reconnecting to live updates")
                }
                ChannelEvent::Error(message) => warn!(%message, "channel error"),
            }
        }

        // without a channel, poll the server every few seconds instead
        ticks_since_refresh += 1;
        let timed_refresh = !live && ticks_since_refresh >= 10;

        if dirty.swap(false, Ordering::AcqRel) || timed_refresh {
            ticks_since_refresh = 0;
            match games.get(&game.id).await {
                Ok(fresh) => print_view(&fresh, &user.id),
                Err(e) => warn!(error = %e, "failed to refresh game state"),
            }
        }

        shutdown.interruptible_sleep(Duration::from_millis(500)).await;
    }

    drop(subscriptions);
    channel.disconnect().await;
    println!("Left the game.");
    Ok(())
}
