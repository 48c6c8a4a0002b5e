//! Calendar-aware durations for date arithmetic in rules
//!
//! Rules write `{dos entry + {days 45}}` or `{months 6}`; the duration keeps
//! month-granularity and day-granularity components separate so month
//! arithmetic follows calendar boundaries instead of a fixed day count.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// A duration as rules express it: whole months plus whole days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleDuration {
    pub months: i32,
    pub days: i64,
}

impl RuleDuration {
    pub fn days(n: i64) -> Self {
        Self { months: 0, days: n }
    }

    pub fn weeks(n: i64) -> Self {
        Self::days(n * 7)
    }

    pub fn months(n: i32) -> Self {
        Self { months: n, days: 0 }
    }

    pub fn years(n: i32) -> Self {
        Self::months(n * 12)
    }

    /// Apply this duration forwards to a date.
    ///
    /// Returns `None` on overflow of the underlying calendar type.
    pub fn add_to(&self, date: NaiveDate) -> Option<NaiveDate> {
        let with_months = if self.months >= 0 {
            date.checked_add_months(Months::new(self.months as u32))?
        } else {
            date.checked_sub_months(Months::new((-self.months) as u32))?
        };
        if self.days >= 0 {
            with_months.checked_add_days(Days::new(self.days as u64))
        } else {
            with_months.checked_sub_days(Days::new((-self.days) as u64))
        }
    }

    /// Apply this duration backwards to a date.
    pub fn sub_from(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.negate().add_to(date)
    }

    fn negate(&self) -> Self {
        Self {
            months: -self.months,
            days: -self.days,
        }
    }
}

impl Add for RuleDuration {
    type Output = RuleDuration;

    fn add(self, rhs: Self) -> Self {
        Self {
            months: self.months + rhs.months,
            days: self.days + rhs.days,
        }
    }
}

impl fmt::Display for RuleDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.months, self.days) {
            (0, d) => write!(f, "{}d", d),
            (m, 0) => write!(f, "{}mo", m),
            (m, d) => write!(f, "{}mo{}d", m, d),
        }
    }
}
