//! Business-day calendar and due-day arithmetic

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashSet;

/// Last day-of-month a monthly schedule may name
pub const MAX_DAY_OF_MONTH: u32 = 31;

/// Weekends plus configured holidays
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessCalendar {
    holidays: HashSet<NaiveDate>,
}

impl BusinessCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        BusinessCalendar {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Monday to Friday and not a holiday
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }
}

/// Number of days in the month of `date`
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(MAX_DAY_OF_MONTH)
}

/// Days-of-month due on `date`
///
/// Normally just today's day. On the last day of a month shorter than 31
/// days, every day from today through 31, so that a schedule on the 31st
/// still runs in April and one on the 29th runs in a 28-day February.
pub fn monthly_candidate_days(date: NaiveDate) -> Vec<u32> {
    let today = date.day();
    if today == days_in_month(date) {
        (today..=MAX_DAY_OF_MONTH).collect()
    } else {
        vec![today]
    }
}

/// ISO weekday number of `date`, Monday = 1
pub fn weekly_candidate_day(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}
