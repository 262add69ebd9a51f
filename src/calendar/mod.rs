//! Working-day calendar.
//!
//! Every calendar day is a duty day except one designated rest weekday.
//! None of these operations fail: they only shift dates by whole days.

mod clock;

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::FixedClock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Calendar arithmetic over working days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingCalendar {
    rest_day: Weekday,
}

impl Default for WorkingCalendar {
    fn default() -> Self {
        Self::new(Weekday::Sat)
    }
}

impl WorkingCalendar {
    pub fn new(rest_day: Weekday) -> Self {
        Self { rest_day }
    }

    /// The weekday on which nobody is on duty.
    pub fn rest_day(&self) -> Weekday {
        self.rest_day
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        date.weekday() != self.rest_day
    }

    /// The working day before `today`.
    ///
    /// Always strictly before `today`; steps over the rest day when yesterday was one.
    pub fn last_working_day(&self, today: NaiveDate) -> NaiveDate {
        let day = today - Duration::days(1);
        if self.is_working_day(day) {
            day
        } else {
            day - Duration::days(1)
        }
    }

    /// First day a prediction may cover after the last committed schedule.
    pub fn first_predictable_day(&self, last_committed: NaiveDate) -> NaiveDate {
        let day = last_committed + Duration::days(1);
        if self.is_working_day(day) {
            day
        } else {
            day + Duration::days(1)
        }
    }

    /// Number of working days in `(from_exclusive, to_inclusive]`.
    ///
    /// Returns 0 for an empty or inverted range. Runs in constant time: every whole week
    /// holds exactly one rest day.
    pub fn count_working_days_between(
        &self,
        from_exclusive: NaiveDate,
        to_inclusive: NaiveDate,
    ) -> u32 {
        let span = (to_inclusive - from_exclusive).num_days();
        if span <= 0 {
            return 0;
        }
        let weeks = span / 7;
        let tail_start = from_exclusive + Duration::days(weeks * 7);
        let tail = (1..=span % 7)
            .filter(|i| self.is_working_day(tail_start + Duration::days(*i)))
            .count() as i64;
        (weeks * 6 + tail) as u32
    }

    /// Working days strictly between `last_committed` and `start`.
    ///
    /// These days have to be predicted before `start` can be, so they extend the window.
    pub fn catch_up_days(&self, last_committed: NaiveDate, start: NaiveDate) -> u32 {
        if start <= last_committed {
            return 0;
        }
        self.count_working_days_between(last_committed, start - Duration::days(1))
    }

    /// The next `count` working days starting at `start` (inclusive).
    pub fn working_days_from(&self, start: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(count);
        let mut cursor = start;
        while days.len() < count {
            if self.is_working_day(cursor) {
                days.push(cursor);
            }
            cursor += Duration::days(1);
        }
        days
    }

    /// Working days left in the current week, counting `today`.
    ///
    /// The week ends on the day before the rest day, so on the rest day itself
    /// nothing is left.
    pub fn working_days_left_in_week(&self, today: NaiveDate) -> u32 {
        let rest = self.rest_day.num_days_from_monday() as i64;
        let current = today.weekday().num_days_from_monday() as i64;
        (rest - current).rem_euclid(7) as u32
    }
}
