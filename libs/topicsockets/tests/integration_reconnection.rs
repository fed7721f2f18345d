//! Integration tests for reconnection behavior
//!
//! These tests verify the backoff strategies and the full outage cycle:
//! losing a connection, redialing and replaying the active topic set.

mod common;

use common::{wait_for, MockPushServer};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use topicsockets::core::connection_state::ConnectionState;
use topicsockets::traits::reconnect::{
    ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy,
};
use topicsockets::{ChannelClient, ChannelError, ChannelEvent};

/// Macro for verbose test output
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

const WAIT: Duration = Duration::from_secs(3);

fn drain_events(client: &ChannelClient) -> Vec<ChannelEvent> {
    let mut events = vec![];
    while let Some(event) = client.try_recv_event() {
        events.push(event);
    }
    events
}

// ============================================================================
// Strategy behavior
// ============================================================================

#[test]
fn test_exponential_backoff_full_sequence() {
    verbose_println!("Testing exponential backoff sequence...");

    let strategy =
        ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10), Some(5));

    let expected_delays = [100, 200, 400, 800, 1600];
    for (attempt, &expected_ms) in expected_delays.iter().enumerate() {
        let delay = strategy.next_delay(attempt).unwrap();
        assert_eq!(
            delay.as_millis(),
            expected_ms,
            "Unexpected delay at attempt {}",
            attempt
        );
    }

    assert!(
        strategy.next_delay(5).is_none(),
        "Should return None after max attempts"
    );
}

#[test]
fn test_exponential_backoff_caps_and_survives_extremes() {
    let strategy =
        ExponentialBackoff::new(Duration::from_millis(500), Duration::from_secs(2), None);

    assert_eq!(strategy.next_delay(0).unwrap().as_millis(), 500);
    assert_eq!(strategy.next_delay(1).unwrap().as_millis(), 1000);
    assert_eq!(strategy.next_delay(2).unwrap().as_millis(), 2000);
    assert_eq!(strategy.next_delay(3).unwrap().as_millis(), 2000);

    // extreme attempt numbers must cap, not overflow
    assert_eq!(strategy.next_delay(1000).unwrap().as_millis(), 2000);
}

#[test]
fn test_fixed_delay_consistency() {
    let strategy = FixedDelay::new(Duration::from_millis(750), None);
    for attempt in 0..100 {
        assert_eq!(
            strategy.next_delay(attempt),
            Some(Duration::from_millis(750)),
            "Fixed delay should be constant"
        );
    }
}

#[test]
fn test_never_reconnect_always_refuses() {
    let strategy = NeverReconnect;
    for attempt in 0..10 {
        assert!(strategy.next_delay(attempt).is_none());
        assert!(!strategy.should_reconnect(attempt));
    }
}

// ============================================================================
// Outage cycle
// ============================================================================

#[tokio::test]
async fn test_connection_loss_triggers_reconnect_and_replay() {
    verbose_println!("Testing reconnect with subscription replay...");

    let server = MockPushServer::start().await;
    let client = ChannelClient::builder()
        .url(server.ws_url())
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(100), None))
        .build();
    client.connect().await.unwrap();

    let turns = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&turns);
    let _turn_sub = client
        .subscribe("game/42/turn", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let _players_sub = client.subscribe("game/42/players", |_| {}).unwrap();
    assert!(wait_for(|| server.subscribe_log().len() == 2, WAIT).await);

    server.sever_connections();

    // the client redials on its own and replays both topics
    assert!(wait_for(|| server.connections_accepted() == 2, WAIT).await);
    assert!(
        wait_for(|| server.subscribe_log().len() == 4, WAIT).await,
        "both topics must be re-subscribed without caller involvement"
    );
    assert!(wait_for(|| client.is_connected(), WAIT).await);
    assert!(wait_for(|| client.metrics().reconnects == 1, WAIT).await);

    // the original listener token still works after the outage
    server.push("game/42/turn", json!({"currentTurnIndex": 9}));
    assert!(wait_for(|| turns.load(Ordering::SeqCst) == 1, WAIT).await);

    assert_eq!(
        drain_events(&client),
        vec![
            ChannelEvent::Connected,
            ChannelEvent::Disconnected,
            ChannelEvent::Reconnecting(1),
            ChannelEvent::Connected,
        ]
    );
}

#[tokio::test]
async fn test_never_reconnect_goes_terminal_on_loss() {
    verbose_println!("Testing terminal outage with NeverReconnect...");

    let server = MockPushServer::start().await;
    let client = ChannelClient::builder()
        .url(server.ws_url())
        .reconnect_strategy(NeverReconnect)
        .build();
    client.connect().await.unwrap();
    let sub = client.subscribe("game/13/turn", |_| {}).unwrap();
    assert!(wait_for(|| server.subscriptions().contains("game/13/turn"), WAIT).await);

    server.sever_connections();

    assert!(
        wait_for(|| client.state() == ConnectionState::Disconnected, WAIT).await,
        "an exhausted strategy must settle in disconnected"
    );
    assert!(!client.is_connected());

    // registrations were cleared; a new subscribe is rejected loudly
    let err = client.subscribe("game/13/turn", |_| {}).unwrap_err();
    assert!(matches!(err, ChannelError::NotConnected { .. }));

    let events = drain_events(&client);
    assert!(
        events.contains(&ChannelEvent::Error("reconnection attempts exhausted".into())),
        "expected an exhaustion error event, got {events:?}"
    );

    // the stale disposer is inert
    sub.unsubscribe();
}

#[tokio::test]
async fn test_bounded_attempts_then_give_up() {
    verbose_println!("Testing bounded reconnect attempts...");

    let server = MockPushServer::start().await;
    let client = ChannelClient::builder()
        .url(server.ws_url())
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(50), Some(2)))
        .build();
    client.connect().await.unwrap();

    // take the whole server down so every redial fails
    server.shutdown();

    assert!(
        wait_for(|| client.state() == ConnectionState::Disconnected, WAIT).await,
        "attempts exhausted, the client must settle in disconnected"
    );

    let events = drain_events(&client);
    let attempts: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            ChannelEvent::Reconnecting(n) => Some(*n),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2], "attempt numbering is per outage");
}

// ============================================================================
// Heartbeats
// ============================================================================

#[tokio::test]
async fn test_heartbeat_keeps_a_healthy_connection_alive() {
    let server = MockPushServer::start().await;
    let client = ChannelClient::builder()
        .url(server.ws_url())
        .heartbeat(Duration::from_millis(50))
        .build();
    client.connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(client.is_connected());
    assert_eq!(
        server.connections_accepted(),
        1,
        "answered pings must not trigger reconnects"
    );
    assert!(
        client.metrics().messages_sent > 3,
        "pings should have been flowing"
    );
}

#[tokio::test]
async fn test_unanswered_pings_force_a_reconnect() {
    verbose_println!("Testing liveness-driven reconnect...");

    let server = MockPushServer::start().await;
    server.set_answer_pings(false);

    let client = ChannelClient::builder()
        .url(server.ws_url())
        .heartbeat(Duration::from_millis(50))
        .liveness_timeout(Duration::from_millis(120))
        .reconnect_strategy(FixedDelay::new(Duration::from_millis(50), None))
        .build();
    client.connect().await.unwrap();

    assert!(
        wait_for(|| server.connections_accepted() >= 2, WAIT).await,
        "a silent server must be treated as a dead connection"
    );
    assert!(wait_for(|| client.metrics().reconnects >= 1, WAIT).await);

    // disconnect cleanly even while the liveness cycle is churning
    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}
