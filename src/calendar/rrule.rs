//! RRULE parsing for the subset of RFC 5545 the expander supports.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use chrono_tz::Tz;
use regex::Regex;

use super::time_utils::date_from_parts;
use crate::ics::codec::parse_ics_date;

static BYDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?\d+)?(SU|MO|TU|WE|TH|FR|SA)$").expect("BYDAY pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// A BYDAY entry such as `MO`, `2SU` or `-1FR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    pub ordinal: Option<i32>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    pub fn parse(entry: &str) -> Option<Self> {
        let caps = BYDAY_RE.captures(entry.trim())?;
        let ordinal = match caps.get(1) {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };
        let weekday = weekday_from_code(caps.get(2)?.as_str())?;
        Some(Self { ordinal, weekday })
    }
}

pub fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code {
        "SU" => Some(Weekday::Sun),
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurrenceRule {
    /// `None` when FREQ is absent or not one of the supported values; such a
    /// rule does not recur.
    pub freq: Option<Frequency>,
    pub interval: Option<u32>,
    pub count: Option<u32>,
    pub until: Option<NaiveDateTime>,
    /// `Some` whenever BYDAY is given, even if none of its entries parse;
    /// a given-but-empty list matches no day.
    pub by_day: Option<Vec<WeekdayNum>>,
    /// 1-based month numbers as written. Out-of-range values are kept so the
    /// expander can reject them instead of falling back to the start month.
    pub by_month: Option<Vec<u32>>,
}

impl RecurrenceRule {
    /// Parse the value of an RRULE property. Unknown parts and values that
    /// fail to parse are skipped; this never fails.
    pub fn parse(raw: &str, zone: Tz) -> Self {
        let mut rule = Self::default();

        for part in raw.split(';') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                continue;
            }

            match key {
                "FREQ" => rule.freq = Frequency::from_code(value),
                "INTERVAL" => rule.interval = positive(value),
                "COUNT" => rule.count = positive(value),
                "UNTIL" => rule.until = parse_ics_date(value, zone),
                "BYDAY" => {
                    rule.by_day = Some(value.split(',').filter_map(WeekdayNum::parse).collect());
                }
                "BYMONTH" => {
                    rule.by_month = Some(
                        value
                            .split(',')
                            .filter_map(|m| m.trim().parse().ok())
                            .collect(),
                    );
                }
                _ => {}
            }
        }

        rule
    }

    pub fn interval(&self) -> u32 {
        self.interval.unwrap_or(1)
    }

    /// Whether `n` emitted occurrences exhaust COUNT.
    pub fn count_reached(&self, n: u32) -> bool {
        self.count.is_some_and(|limit| n >= limit)
    }

    pub fn is_after_until(&self, instant: NaiveDateTime) -> bool {
        self.until.is_some_and(|until| instant > until)
    }

    /// Zero-based month of the first BYMONTH value, if it names a real month.
    pub fn first_month0(&self) -> Option<u32> {
        let month = *self.by_month.as_ref()?.first()?;
        (1..=12).contains(&month).then(|| month - 1)
    }
}

fn positive(value: &str) -> Option<u32> {
    value.parse().ok().filter(|n| *n > 0)
}

/// The `ordinal`-th `weekday` of a month (`month0` is zero-based). Negative
/// ordinals count from the end of the month; zero or absent means first.
/// Returns `None` when the requested occurrence falls outside the month,
/// e.g. a fifth Monday in a month with four.
pub fn nth_weekday_of_month(
    year: i32,
    month0: u32,
    weekday: Weekday,
    ordinal: Option<i32>,
) -> Option<NaiveDate> {
    let ordinal = match ordinal {
        None | Some(0) => 1,
        Some(n) => i64::from(n),
    };
    let target = i64::from(weekday.num_days_from_sunday());
    let month = i64::from(month0);

    let day = if ordinal > 0 {
        let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)?;
        let offset = (target - i64::from(first.weekday().num_days_from_sunday()) + 7) % 7;
        1 + offset + (ordinal - 1) * 7
    } else {
        let last = date_from_parts(year, month + 1, 0)?;
        let offset = (i64::from(last.weekday().num_days_from_sunday()) - target + 7) % 7;
        i64::from(last.day()) - offset + (ordinal + 1) * 7
    };

    let candidate = date_from_parts(year, month, day)?;
    (candidate.year() == year && candidate.month0() == month0).then_some(candidate)
}
