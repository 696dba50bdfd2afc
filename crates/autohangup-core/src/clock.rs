//! Monotonic time source.
//!
//! Deadlines are compared against this clock only, never against wall-clock
//! time, so adjusting the system time cannot shorten or extend a countdown.

use tokio::time::Instant;

/// Monotonic milliseconds since an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Clock backed by [`tokio::time::Instant`].
///
/// Follows the tokio runtime's notion of time, so it advances with
/// `tokio::time::pause`/`advance` under test.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
