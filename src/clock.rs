use chrono::{DateTime, Utc};

/// Source of "now" for timestamps, injectable so tests can pin or step time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use test_clocks::{FixedClock, SteppingClock};
