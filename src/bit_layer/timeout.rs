use std::hint;
use std::time::{Duration, Instant};

/// Countdown started with a duration, checked against the monotonic clock.
#[derive(Copy, Clone, Debug)]
pub struct Timeout {
    started: Instant,
    duration: Duration,
}

impl Timeout {
    pub fn start(duration: Duration) -> Self {
        Timeout {
            started: Instant::now(),
            duration,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.duration
    }

    /// Polls `condition` until it holds or the countdown runs out.
    ///
    /// Returns whether the condition was met. The condition is always
    /// checked at least once, even if the countdown already expired.
    pub fn poll_until<F>(&self, mut condition: F) -> bool
    where
        F: FnMut() -> bool,
    {
        loop {
            if condition() {
                return true;
            }
            if self.is_expired() {
                return false;
            }
        }
    }
}

/// Busy-waits for `duration`. Sleeping is far too coarse for bit timing.
pub fn delay(duration: Duration) {
    if duration == Duration::from_secs(0) {
        return;
    }

    let started = Instant::now();
    while started.elapsed() < duration {
        hint::spin_loop();
    }
}
