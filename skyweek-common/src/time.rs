//! Timestamp and week-key utilities
//!
//! Weekly content is keyed by the first day of the week containing the
//! reference instant. Every computation goes through a [`Clock`] so callers
//! can pin time in tests.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// First day of the content week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    /// ISO weeks (default)
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    /// Normalize a date to the first day of its week
    pub fn week_of(self, date: NaiveDate) -> NaiveDate {
        let offset = match self {
            WeekStart::Monday => date.weekday().num_days_from_monday(),
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
        };
        date - Duration::days(i64::from(offset))
    }

    /// Week key for an instant (UTC calendar date)
    pub fn week_key(self, instant: DateTime<Utc>) -> NaiveDate {
        self.week_of(instant.date_naive())
    }
}

/// Instant at which the week starting on `week_start` ends
pub fn week_end(week_start: NaiveDate) -> DateTime<Utc> {
    (week_start + Duration::days(7)).and_time(NaiveTime::MIN).and_utc()
}

/// ISO-8601 date-only form used as the natural key component
pub fn week_key_string(week_start: NaiveDate) -> String {
    week_start.format("%Y-%m-%d").to_string()
}

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
