use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Tracks ping/pong timing to decide whether a connection is still alive
///
/// The message loop records every application-level ping it sends and every
/// pong it sees. A connection is unhealthy once the oldest unanswered ping
/// has waited longer than `timeout` for its pong, which forces the
/// reconnect path even though the socket never reported an error.
///
/// Timestamps are epoch milliseconds in atomics, so the tracker can be read
/// from the heartbeat tick without locking. Zero means "never".
#[derive(Debug)]
pub struct LivenessTracker {
    last_ping_sent: AtomicU64,
    last_pong_seen: AtomicU64,
    timeout: Duration,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl LivenessTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_ping_sent: AtomicU64::new(0),
            last_pong_seen: AtomicU64::new(0),
            timeout,
        }
    }

    /// Record an outgoing ping
    ///
    /// An unanswered ping keeps its original timestamp, so the wait is
    /// measured from the first ping that got no reply rather than from
    /// the latest retry.
    pub fn record_ping_sent(&self) {
        let ping = self.last_ping_sent.load(Ordering::Acquire);
        let pong = self.last_pong_seen.load(Ordering::Acquire);
        if ping == 0 || pong >= ping {
            self.last_ping_sent.store(now_ms(), Ordering::Release);
        }
    }

    pub fn record_pong_seen(&self) {
        self.last_pong_seen.store(now_ms(), Ordering::Release);
    }

    /// True while no ping is overdue for its pong
    pub fn is_healthy(&self) -> bool {
        let ping = self.last_ping_sent.load(Ordering::Acquire);
        if ping == 0 {
            // nothing sent yet, nothing to be late for
            return true;
        }

        let pong = self.last_pong_seen.load(Ordering::Acquire);
        if pong >= ping {
            return true;
        }

        now_ms().saturating_sub(ping) < self.timeout.as_millis() as u64
    }

    /// Forget all timing, used when a fresh connection replaces a dead one
    pub fn reset(&self) {
        self.last_ping_sent.store(0, Ordering::Release);
        self.last_pong_seen.store(0, Ordering::Release);
    }
}
