//! Time source used by the store.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveTime, Utc};

/// Supplies the current instant and the user's local wall-clock time.
pub trait Clock: Send + Sync {
    /// Current instant, used for notification timestamps.
    fn now(&self) -> DateTime<Utc>;

    /// Local time of day, used for quiet-hours checks.
    fn local_time(&self) -> NaiveTime;
}

/// Clock backed by the system time and local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_time(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    /// Start at `at`; its offset defines local time.
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self {
            current: Mutex::new(at),
        }
    }

    /// Jump to `at`.
    pub fn set(&self, at: DateTime<FixedOffset>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current += by;
    }

    fn current(&self) -> DateTime<FixedOffset> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.current().with_timezone(&Utc)
    }

    fn local_time(&self) -> NaiveTime {
        self.current().time()
    }
}
