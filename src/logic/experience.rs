use chrono::{Datelike, NaiveDate};
use std::iter::Sum;
use std::ops::Add;

use crate::model::Experience;

const DAYS_PER_MONTH: i64 = 30;

/// Calendar interval with the same semantics as a Postgres `interval`
/// produced by `age(date, date)`: months and days are kept apart, and
/// comparisons count a month as 30 days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
}

impl Interval {
    /// Field-wise difference `end - start`, borrowing days from the start month
    pub fn age(end: NaiveDate, start: NaiveDate) -> Self {
        if end < start {
            let inverse = Self::age(start, end);
            return Self {
                months: -inverse.months,
                days: -inverse.days,
            };
        }

        let mut years = end.year() - start.year();
        let mut months = end.month() as i32 - start.month() as i32;
        let mut days = end.day() as i32 - start.day() as i32;

        if days < 0 {
            days += days_in_month(start.year(), start.month());
            months -= 1;
        }
        if months < 0 {
            months += 12;
            years -= 1;
        }

        Self {
            months: years * 12 + months,
            days,
        }
    }

    pub fn total_days(&self) -> i64 {
        i64::from(self.months) * DAYS_PER_MONTH + i64::from(self.days)
    }

    pub fn at_least_months(&self, months: u32) -> bool {
        self.total_days() >= i64::from(months) * DAYS_PER_MONTH
    }

    pub fn whole_months(&self) -> i64 {
        self.total_days().div_euclid(DAYS_PER_MONTH)
    }
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, other: Interval) -> Interval {
        Interval {
            months: self.months + other.months,
            days: self.days + other.days,
        }
    }
}

impl Sum for Interval {
    fn sum<I: Iterator<Item = Interval>>(iter: I) -> Self {
        iter.fold(Interval::default(), Add::add)
    }
}

fn days_in_month(year: i32, month: u32) -> i32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => (next - first).num_days() as i32,
        _ => 30,
    }
}

/// Duration of one experience; ongoing positions end `today`
pub fn experience_span(start: NaiveDate, end: Option<NaiveDate>, today: NaiveDate) -> Interval {
    Interval::age(end.unwrap_or(today), start)
}

/// Summed duration of all experiences, as the search sub-query computes it
pub fn total_experience(experiences: &[Experience], today: NaiveDate) -> Interval {
    experiences
        .iter()
        .map(|e| experience_span(e.start_date, e.end_date, today))
        .sum()
}
