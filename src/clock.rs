// src/clock.rs

//! Replaceable time source.
//!
//! Everything time-based (triggers, integration timestamps) reads the time
//! through [`Clock`], so tests can drive schedules with a [`FakeClock`]
//! instead of sleeping.

use std::fmt::Debug;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use parking_lot::Mutex;

/// Source of the current local wall-clock time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Real system clock (local time zone).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Fake clock for testing with controllable time.
///
/// Clones share the same underlying time, so a clone handed to a project
/// loop moves when the test advances the original.
#[derive(Debug, Clone)]
pub struct FakeClock {
    current: Arc<Mutex<NaiveDateTime>>,
}

impl FakeClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Start at `2024-01-01 00:00:00`.
    pub fn at_epoch() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self::new(start)
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, by: Duration) {
        *self.current.lock() += by;
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.current.lock() = to;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::at_epoch()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> NaiveDateTime {
        *self.current.lock()
    }
}
