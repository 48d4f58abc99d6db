//! Time source for display deadlines and run timing.

use std::future::Future;
use tokio::time::{Duration, Instant};

/// Millisecond clock with an awaitable deadline.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now_ms(&self) -> u64;

    /// Resolve once `now_ms() >= deadline_ms`.
    fn sleep_until(&self, deadline_ms: u64) -> impl Future<Output = ()> + Send;
}

/// Wall clock measured from when it was created.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    async fn sleep_until(&self, deadline_ms: u64) {
        tokio::time::sleep_until(self.origin + Duration::from_millis(deadline_ms)).await;
    }
}
