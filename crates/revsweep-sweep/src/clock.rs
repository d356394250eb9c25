//! Time sources used for progress pacing.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A source of wall-clock time in milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// The system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// A manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: AtomicU64,
}

impl VirtualClock {
    pub fn new(start: u64) -> Self {
        VirtualClock {
            now: AtomicU64::new(start),
        }
    }

    /// Move the clock forward, returning the new time.
    pub fn advance(&self, millis: u64) -> u64 {
        self.now.fetch_add(millis, Ordering::SeqCst) + millis
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock() {
        let clock = VirtualClock::new(1000);
        assert_eq!(clock.now_millis(), 1000);
        assert_eq!(clock.advance(500), 1500);
        clock.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
