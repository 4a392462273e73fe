//! Clock abstraction.
//!
//! All reminder decisions compare naive local timestamps, so "now" must be
//! produced in one configured zone rather than read ad hoc. Injecting the
//! clock also lets tests pin time exactly.

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

/// Source of "now" as a naive local timestamp in a fixed zone.
pub trait Clock: Send + Sync {
    /// Current naive local time in the configured zone.
    fn now(&self) -> NaiveDateTime;
}

/// System clock evaluating "now" in a configured time zone.
#[derive(Debug, Clone)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    /// Clock in the given zone.
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Clock in UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self::new(chrono_tz::UTC)
    }

    /// The configured zone.
    #[must_use]
    pub fn zone(&self) -> Tz {
        self.tz
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }
}

/// Clock pinned to an explicit instant, settable from tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    /// Clock pinned to `now`.
    #[must_use]
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Move the pinned instant.
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}
