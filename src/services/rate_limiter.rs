use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::utils::clock::{Clock, Sleeper, SystemClock, TokioSleeper};

/// Keeps outbound AI requests at least `min_interval` apart.
///
/// The timestamp lock is held across the wait, so concurrent callers are
/// admitted one at a time in arrival order.
pub struct RateLimiter {
    min_interval: Duration,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    last_request: Mutex<Option<Duration>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(
            min_interval,
            Arc::new(SystemClock::new()),
            Arc::new(TokioSleeper),
        )
    }

    pub fn with_clock(
        min_interval: Duration,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            min_interval,
            clock,
            sleeper,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn wait_for_next(&self) {
        let mut last_request = self.last_request.lock().await;

        if let Some(previous) = *last_request {
            let since_last = self.clock.now().saturating_sub(previous);
            if since_last < self.min_interval {
                let wait = self.min_interval - since_last;
                debug!(
                    target: "app::ai::limiter",
                    wait_ms = wait.as_millis() as u64,
                    "throttling AI request"
                );
                self.sleeper.sleep(wait).await;
            }
        }

        *last_request = Some(self.clock.now());
    }
}
