//! Conversions for the ICS value types the parser understands: DATE and
//! DATE-TIME values, and the day/time subset of DURATION.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?")
        .expect("duration pattern is valid")
});

/// Parse an ICS `DATE` (`YYYYMMDD`) or `DATE-TIME` (`YYYYMMDDTHHMMSS[Z]`) value
/// into wall-clock time in `zone`.
///
/// A trailing `Z` marks the fields as UTC; they are converted into `zone`.
/// Without it the value is floating and returned as written. Date-only
/// values are always floating midnight.
pub fn parse_ics_date(raw: &str, zone: Tz) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let (digits, is_utc) = match raw.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (raw, false),
    };

    match digits.split_once('T') {
        Some((date, time)) => {
            let naive = parse_date_fields(date)?.and_time(parse_time_fields(time)?);
            if is_utc {
                Some(zone.from_utc_datetime(&naive).naive_local())
            } else {
                Some(naive)
            }
        }
        None => Some(parse_date_fields(digits)?.and_time(NaiveTime::MIN)),
    }
}

fn parse_date_fields(s: &str) -> Option<NaiveDate> {
    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6)?.parse().ok()?;
    let day: u32 = s.get(6..8)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_time_fields(s: &str) -> Option<NaiveTime> {
    let hour: u32 = s.get(0..2)?.parse().ok()?;
    let minute: u32 = s.get(2..4)?.parse().ok()?;
    let second: u32 = s.get(4..6)?.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Parse a `DURATION` value such as `P1D`, `PT2H`, `PT30M` or `P1DT2H30M`
/// into milliseconds. Week, month and year designators are not supported;
/// a value with no recognizable components, or one too large to represent,
/// yields 0.
pub fn parse_duration_ms(raw: &str) -> i64 {
    let Some(caps) = DURATION_RE.captures(raw) else {
        return 0;
    };
    let part = |i: usize| -> Option<i64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let total = || -> Option<i64> {
        let hours = part(1)?.checked_mul(24)?.checked_add(part(2)?)?;
        let minutes = hours.checked_mul(60)?.checked_add(part(3)?)?;
        let seconds = minutes.checked_mul(60)?.checked_add(part(4)?)?;
        seconds.checked_mul(1000)
    };
    total().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn utc_value_is_fourteen_hundred_utc() {
        let dt = parse_ics_date("20250615T140000Z", Tz::UTC).unwrap();
        assert_eq!(dt, local(2025, 6, 15, 14, 0, 0));
    }

    #[test]
    fn utc_value_converts_into_display_zone() {
        // New York is UTC-4 in June.
        let dt = parse_ics_date("20250615T140000Z", chrono_tz::America::New_York).unwrap();
        assert_eq!(dt, local(2025, 6, 15, 10, 0, 0));
    }

    #[test]
    fn floating_value_is_not_converted() {
        let dt = parse_ics_date("20250615T140000", chrono_tz::America::New_York).unwrap();
        assert_eq!(dt, local(2025, 6, 15, 14, 0, 0));
    }

    #[test]
    fn date_only_value_is_local_midnight() {
        let dt = parse_ics_date("20251224", chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(dt.date().day(), 24);
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.minute(), 0);
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert!(parse_ics_date("", Tz::UTC).is_none());
        assert!(parse_ics_date("2025", Tz::UTC).is_none());
        assert!(parse_ics_date("20251340", Tz::UTC).is_none());
        assert!(parse_ics_date("20250615T14", Tz::UTC).is_none());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration_ms("P1D"), 86_400_000);
        assert_eq!(parse_duration_ms("PT2H"), 7_200_000);
        assert_eq!(parse_duration_ms("PT30M"), 1_800_000);
        assert_eq!(parse_duration_ms("PT45S"), 45_000);
        assert_eq!(parse_duration_ms("P1DT2H30M"), 95_400_000);
    }

    #[test]
    fn unsupported_duration_components_count_as_zero() {
        assert_eq!(parse_duration_ms("P2W"), 0);
        assert_eq!(parse_duration_ms("nonsense"), 0);
    }

    #[test]
    fn oversized_durations_count_as_zero() {
        assert_eq!(parse_duration_ms("P99999999999999D"), 0);
        assert_eq!(parse_duration_ms("PT99999999999999999999S"), 0);
        assert_eq!(parse_duration_ms("P999999999D"), 86_399_999_913_600_000);
    }
}
