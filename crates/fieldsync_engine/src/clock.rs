//! Server time source.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Supplies the server UTC time used to stamp accepted writes and cursors.
///
/// Implementations must never return the same instant twice: `updated_at`
/// values double as sync cursors, and a repeated instant would either
/// re-deliver or silently skip rows at the cursor boundary.
pub trait Clock: Send + Sync {
    /// Returns the current server time.
    fn now(&self) -> DateTime<Utc>;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Wall-clock time, truncated to microseconds and forced strictly
/// increasing.
///
/// Microsecond truncation keeps stamps stable across stores that round
/// sub-microsecond precision away; the high-water mark guards against
/// same-tick reads and clock regression.
#[derive(Debug, Default)]
pub struct SystemClock {
    high_water: Mutex<Option<DateTime<Utc>>>,
}

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now();
        let truncated =
            DateTime::<Utc>::from_timestamp_micros(wall.timestamp_micros()).unwrap_or(wall);

        let mut high_water = self.high_water.lock();
        let now = match *high_water {
            Some(last) if truncated <= last => last + Duration::microseconds(1),
            _ => truncated,
        };
        *high_water = Some(now);
        now
    }
}

/// Hand-controlled clock for tests.
///
/// Every read advances one microsecond past the previous one, so
/// consecutive stamps stay distinct without test code having to tick
/// manually. `advance` jumps the clock forward in larger steps.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock whose next read follows `start`.
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Jumps the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock();
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.current.lock();
        *current += Duration::microseconds(1);
        *current
    }
}
