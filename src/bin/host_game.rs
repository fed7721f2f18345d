//! Host a game: create it, run the lobby, drive the turns
//!
//! Creates a user and a game, prints the join code, shows the roster
//! live while players trickle in, then takes commands from stdin:
//! `start [spies]`, `next`, `image`, `quit`.
//!
//! Usage: host_game <username>

use anyhow::{Context, Result};
use spygame::{channel_for, GameApi, GameTopics, Settings, ShutdownManager, UserApi};
use std::sync::mpsc;
use std::time::Duration;
use topicsockets::ChannelEvent;
use tracing::{info, warn};

/// Stdin commands, read on a dedicated thread so the event loop never
/// blocks on the terminal
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => return,
                Ok(_) => {
                    if tx.send(line.trim().to_string()).is_err() {
                        return;
                    }
                }
            }
        }
    });
    rx
}

#[tokio::main]
async fn main() -> Result<()> {
    spygame::init_tracing();

    let username = std::env::args()
        .nth(1)
        .context("usage: host_game <username>")?;

    let settings = Settings::from_env();
    let users = UserApi::new(settings.api_url.clone());
    let games = GameApi::new(settings.api_url.clone());

    let host = users.create(&username).await.context("creating user")?;
    let game = games.create(&host.id).await.context("creating game")?;

    println!("Game created. Join code: {}", game.join_code);
    println!("Commands: start [spies] | next | image | quit\n");

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let channel = channel_for(&settings);
    let mut roster_subscription = None;

    match channel.connect().await {
        Ok(()) => {
            let topics = GameTopics::for_game(&game.id);
            roster_subscription = Some(channel.subscribe(topics.players, |payload| {
                if let Some(players) = payload.get("players").and_then(|v| v.as_array()) {
                    println!("Lobby: {} player(s)", players.len());
                }
            })?);
            info!("watching the lobby live");
        }
        Err(e) => {
            warn!(error = %e, "live updates unavailable; roster will not refresh");
        }
    }

    let commands = spawn_stdin_reader();

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

        match commands.try_recv() {
            Ok(command) => {
                let mut parts = command.split_whitespace();
                match parts.next() {
                    Some("start") => {
                        let spies = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1);
                        match games.start(&game.id, &host.id, spies).await {
                            Ok(started) => {
                                println!(
                                    "Game started with {} player(s), {} spy(ies)",
                                    started.players.len(),
                                    spies
                                );
                            }
                            Err(e) => warn!(error = %e, "failed to start game"),
                        }
                    }
                    Some("next") => match games.next_turn(&game.id, &host.id).await {
                        Ok(updated) => match updated.current_player() {
                            Some(player) => println!("Turn advanced; now up: {}", player),
                            None => println!("Turn advanced"),
                        },
                        Err(e) => warn!(error = %e, "failed to advance turn"),
                    },
                    Some("image") => {
                        println!("Generating image...");
                        match games.generate_image(&game.id, &host.id).await {
                            Ok(generated) => println!("Image ready: {}", generated.image_url),
                            Err(e) => warn!(error = %e, "failed to generate image"),
                        }
                    }
                    Some("quit") | Some("q") => break,
                    Some(other) => println!("Unknown command: {}", other),
                    None => {}
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => break,
        }

        shutdown.interruptible_sleep(Duration::from_millis(100)).await;
    }

    drop(roster_subscription);
    channel.disconnect().await;
    println!("Game closed.");
    Ok(())
}
