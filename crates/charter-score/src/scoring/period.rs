//! Calendar bucketing for reporting periods.
//!
//! Weekly buckets are Monday to Sunday and are filed under the calendar month of their
//! Thursday, so a week straddling a month boundary belongs to exactly one month.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;

use super::domain::PeriodType;

/// One reporting bucket, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

/// A Monday to Sunday week together with the month its Thursday falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekBucket {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub thursday: NaiveDate,
}

impl WeekBucket {
    pub fn containing(date: NaiveDate) -> Self {
        let start = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        Self {
            start,
            end: start + Duration::days(6),
            thursday: start + Duration::days(3),
        }
    }

    /// `(year, month)` the week is assigned to.
    pub fn assigned_month(&self) -> (i32, u32) {
        (self.thursday.year(), self.thursday.month())
    }

    pub fn is_assigned_to(&self, year: i32, month: u32) -> bool {
        self.assigned_month() == (year, month)
    }

    pub fn label(&self) -> String {
        format!("Week of {}", self.start.format("%Y-%m-%d"))
    }
}

/// Weeks starting at the Monday on or before `start` and running while the week begins on
/// or before `end`.
pub fn weeks_by_thursday(start: NaiveDate, end: NaiveDate) -> Vec<WeekBucket> {
    let mut weeks = Vec::new();
    let mut current = WeekBucket::containing(start);
    while current.start <= end {
        weeks.push(current);
        current = WeekBucket::containing(current.start + Duration::days(7));
    }
    weeks
}

/// Split `[start, end]` into non-overlapping buckets of `period_type`, ordered by start.
pub fn generate(start: NaiveDate, end: NaiveDate, period_type: PeriodType) -> Vec<Period> {
    let periods: Vec<Period> = match period_type {
        PeriodType::Weekly => weeks_by_thursday(start, end)
            .into_iter()
            .map(|week| Period {
                start: week.start,
                end: week.end,
                label: week.label(),
            })
            .collect(),
        PeriodType::Monthly => stepped(first_of_month(start), end, 1, |first| {
            first.format("%B %Y").to_string()
        }),
        PeriodType::Quarterly => {
            let first_month = (start.month0() / 3) * 3 + 1;
            stepped(month_start(start.year(), first_month), end, 3, |first| {
                format!("Q{} {}", first.month0() / 3 + 1, first.year())
            })
        }
        PeriodType::Semester => {
            let first_month = if start.month() <= 6 { 1 } else { 7 };
            stepped(month_start(start.year(), first_month), end, 6, |first| {
                let half = if first.month() <= 6 { 1 } else { 2 };
                format!("Semester {} {}", half, first.year())
            })
        }
        PeriodType::Yearly => stepped(month_start(start.year(), 1), end, 12, |first| {
            format!("Year {}", first.year())
        }),
    };

    periods
        .into_iter()
        .filter(|period| period.start <= end && period.end >= start)
        .collect()
}

/// Month label a realization dated `date` is reported under when the item is tracked
/// weekly. Data entry and scoring both go through the Thursday of the date's week.
pub fn assigned_period_label(date: NaiveDate) -> String {
    let (year, month) = WeekBucket::containing(date).assigned_month();
    month_start(year, month).format("%B %Y").to_string()
}

/// Weeks filed under `year`/`month` by the Thursday rule. Each week's Thursday is the
/// canonical realization date for that week.
pub fn weeks_in_month(year: i32, month: u32) -> Vec<WeekBucket> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let last = last_day_of_month(first);

    weeks_by_thursday(first - Duration::days(7), last + Duration::days(7))
        .into_iter()
        .filter(|week| week.is_assigned_to(year, month))
        .collect()
}

/// First day of every calendar month touched by `[start, end]`.
pub fn months_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut current = first_of_month(start);
    let stop = first_of_month(end);
    while current <= stop {
        months.push(current);
        match current.checked_add_months(Months::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }
    months
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Whether `[start, end]` covers exactly one calendar month.
pub fn is_full_month(start: NaiveDate, end: NaiveDate) -> bool {
    start.day() == 1 && end == last_day_of_month(start)
}

fn month_start(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn stepped<F>(first: NaiveDate, end: NaiveDate, months: u32, label: F) -> Vec<Period>
where
    F: Fn(NaiveDate) -> String,
{
    let mut periods = Vec::new();
    let mut current = first;
    while current <= end {
        let Some(next) = current.checked_add_months(Months::new(months)) else {
            break;
        };
        periods.push(Period {
            start: current,
            end: next.pred_opt().unwrap_or(next),
            label: label(current),
        });
        current = next;
    }
    periods
}
