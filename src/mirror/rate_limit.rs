//! Advisory backpressure on outbound sends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::debug;

/// Default number of consecutive sends before a cooldown.
pub const DEFAULT_LIMIT: usize = 50;

/// Default cooldown after the limit is exceeded.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(100);

/// Counts sends across all handlers and pauses after every `limit + 1`.
///
/// Never rejects work, only delays it.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    cooldown: Duration,
    sent: AtomicUsize,
}

impl RateLimiter {
    pub fn new(limit: usize, cooldown: Duration) -> Self {
        Self {
            limit,
            cooldown,
            sent: AtomicUsize::new(0),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Sends counted since the last cooldown.
    pub fn count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    /// Count one send. Returns `true` when the limit was exceeded and the
    /// counter was reset, meaning the caller owes a cooldown.
    pub fn tick(&self) -> bool {
        let mut tripped = false;
        self.sent
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                let next = n + 1;
                tripped = next > self.limit;
                Some(if tripped { 0 } else { next })
            })
            .ok();
        tripped
    }

    /// Count one send and sleep for the cooldown if the limit was exceeded.
    pub async fn throttle(&self) {
        if self.tick() {
            debug!(
                cooldown_ms = self.cooldown.as_millis() as u64,
                "Send limit reached, cooling down"
            );
            tokio::time::sleep(self.cooldown).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_COOLDOWN)
    }
}
