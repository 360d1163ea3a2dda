use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// The calendar month `[1st 00:00, 1st of next month 00:00)`.
    /// `month0` is zero-based.
    pub fn month(year: i32, month0: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)?;
        let next = first.checked_add_months(Months::new(1))?;
        Some(Self::new(start_of_day(first), start_of_day(next)))
    }

    /// Half-open interval overlap: [start, end)
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Build a date from a year, a zero-based month and a day, rolling
/// out-of-range months and days over into neighbouring months the way
/// wall-clock calendar arithmetic does: day 31 of a 30-day month is the
/// 1st of the next, day 0 is the last day of the previous month.
pub fn date_from_parts(year: i32, month0: i64, day: i64) -> Option<NaiveDate> {
    let total = i64::from(year) * 12 + month0;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_signed(TimeDelta::days(day - 1))
}

/// Months since year 0, used to stride monthly rules.
pub fn month_index(dt: NaiveDateTime) -> i64 {
    i64::from(dt.year()) * 12 + i64::from(dt.month0())
}

pub fn days_in_month(year: i32, month0: u32) -> u32 {
    date_from_parts(year, i64::from(month0) + 1, 0)
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Milliseconds since the epoch, reading the wall clock as UTC.
pub fn epoch_ms(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp_millis()
}

/// Number of calendar days an event covers, never less than one.
pub fn days_spanned(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let ms = (end - start).num_milliseconds();
    if ms <= 0 {
        return 1;
    }
    ((ms + DAY_MS - 1) / DAY_MS).max(1)
}

pub fn is_midnight(dt: NaiveDateTime) -> bool {
    dt.time() == NaiveTime::MIN
}

/// An exclusive end at exactly midnight belongs to the previous day.
pub fn adjusted_end(end: NaiveDateTime) -> NaiveDateTime {
    if is_midnight(end) {
        end - TimeDelta::days(1)
    } else {
        end
    }
}
