//! Settle-delay abstraction, so tests don't have to wait on real time.

use std::time::Duration;

/// Something that can pause the calling thread. A trait (rather than a
/// direct `std::thread::sleep` call) so tests can substitute a no-op and
/// still assert the delay was requested.
pub trait Sleeper: Send + Sync {
    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Production sleeper: blocks the thread for real.
#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Test sleeper: records every requested delay without blocking.
#[derive(Default)]
pub struct NoopSleeper {
    calls: parking_lot::Mutex<Vec<Duration>>,
}

impl NoopSleeper {
    /// Construct a sleeper that records calls but never blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration requested so far, in order.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().clone()
    }
}

impl Sleeper for NoopSleeper {
    fn sleep(&self, duration: Duration) {
        self.calls.lock().push(duration);
    }
}
