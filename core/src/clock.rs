use chrono::{DateTime, Utc};

/// The only source of `now` (component K in §2). Tests inject a
/// `VirtualClock` (see the `mocks` crate) to exercise TTL expiry
/// deterministically without sleeping real time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock backed implementation used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
