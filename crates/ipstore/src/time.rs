//! Time source for bucket naming.
//!
//! Bucket names are calendar dates in the host's local time zone. The store
//! asks a [`Clock`] for "today" instead of reading the wall clock directly,
//! so date rollover can be exercised in tests.

use chrono::NaiveDate;

/// Supplies the current calendar date.
pub trait Clock {
    /// Return today's date.
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock frozen at a fixed date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl FixedClock {
    /// Build a clock for `year-month-day`.
    ///
    /// Returns `None` if the date does not exist.
    pub fn ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}
