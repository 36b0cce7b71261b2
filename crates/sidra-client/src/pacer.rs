//! Fixed-delay pacer for sequential upstream sweeps. The first tick is
//! immediate; every later tick sleeps the configured delay first.

use std::time::Duration;

/// Spaces out consecutive requests within one synchronization sweep.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    /// Waits before the next request. No-op on the first call.
    pub async fn tick(&mut self) {
        if self.started {
            tokio::time::sleep(self.delay).await;
        } else {
            self.started = true;
        }
    }
}
