use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Suspends the current task.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone)]
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
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Deterministic clock and sleeper for tests.
pub mod testing {
    use super::*;

    /// Clock that only moves when told to.
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock {
        elapsed: Arc<Mutex<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn advance(&self, by: Duration) {
            let mut guard = self.elapsed.lock().expect("clock lock poisoned");
            *guard += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            *self.elapsed.lock().expect("clock lock poisoned")
        }
    }

    /// Records every requested sleep and advances the paired clock instead of
    /// waiting.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingSleeper {
        clock: ManualClock,
        calls: Arc<Mutex<Vec<Duration>>>,
    }

    impl RecordingSleeper {
        pub fn new(clock: ManualClock) -> Self {
            Self {
                clock,
                calls: Arc::default(),
            }
        }

        pub fn calls(&self) -> Vec<Duration> {
            self.calls.lock().expect("sleeper lock poisoned").clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.calls
                .lock()
                .expect("sleeper lock poisoned")
                .push(duration);
            self.clock.advance(duration);
        }
    }
}
