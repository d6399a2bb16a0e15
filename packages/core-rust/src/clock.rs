//! Clock abstraction for `createdAt` stamps and the duration formula's
//! reference date.
//!
//! Production code uses [`SystemClock`]; tests pin time with [`FixedClock`]
//! so that derived durations are deterministic.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Abstraction over "now" for dependency injection.
pub trait ClockSource: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date. Defaults to the UTC date of [`now`](Self::now).
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Clock that reads the real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    /// A clock frozen at `instant`.
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// A clock frozen at midnight UTC of `date`.
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        Self::at(date.and_time(NaiveTime::MIN).and_utc())
    }
}

impl ClockSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_its_date() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 10).expect("valid date");
        let clock = FixedClock::on(date);
        assert_eq!(clock.today(), date);
        assert_eq!(clock.now().to_rfc3339(), "2025-08-10T00:00:00+00:00");
    }

    #[test]
    fn system_clock_is_after_2020() {
        let floor = NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date");
        assert!(SystemClock.today() > floor);
    }
}
