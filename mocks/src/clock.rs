//! A settable clock for deterministic TTL-expiry tests (§9 "Clock injection").

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use scrum_core::clock::Clock;

/// A `Clock` whose `now()` is fixed until explicitly advanced, so claim
/// expiry and agent-offline derivations can be tested without sleeping
/// real time.
pub struct VirtualClock {
    now: Mutex<DateTime<Utc>>,
}

impl VirtualClock {
    /// Start the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Start the clock at the current wall-clock time.
    pub fn at_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now += duration;
    }

    /// Move the clock forward by `secs` seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    /// Pin the clock to an exact instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
