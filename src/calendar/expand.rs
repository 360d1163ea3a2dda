//! Recurrence expansion: turns one parsed event and its RRULE into the
//! concrete occurrences that fall inside a half-open window.
//!
//! COUNT is treated as a cap on occurrences over the rule's lifetime, but each
//! frequency only scans forward from where the window lets it start, so a
//! COUNT-limited rule is only exact when windows are visited in order from
//! the event's first occurrence. WEEKLY rules do not apply COUNT at all.

use std::ops::ControlFlow;

use chrono::{Datelike, NaiveDateTime, TimeDelta, Weekday};
use chrono_tz::Tz;

use super::event::{Occurrence, ParsedEvent};
use super::rrule::{Frequency, RecurrenceRule, nth_weekday_of_month};
use super::time_utils::{DAY_MS, TimeRange, date_from_parts, month_index};

/// Expand `event` into its occurrences within `range` (end exclusive).
/// Events without a usable rule are returned as-is when they overlap.
pub fn expand_event(event: &ParsedEvent, range: &TimeRange, zone: Tz) -> Vec<Occurrence> {
    let Some(ref raw) = event.rrule else {
        return single(event, range);
    };
    expand_with_rule(event, &RecurrenceRule::parse(raw, zone), range)
}

pub fn expand_with_rule(
    event: &ParsedEvent,
    rule: &RecurrenceRule,
    range: &TimeRange,
) -> Vec<Occurrence> {
    match rule.freq {
        Some(Frequency::Daily) => daily(event, rule, range),
        Some(Frequency::Weekly) => weekly(event, rule, range),
        Some(Frequency::Monthly) => monthly(event, rule, range),
        Some(Frequency::Yearly) => yearly(event, rule, range),
        None => single(event, range),
    }
}

fn single(event: &ParsedEvent, range: &TimeRange) -> Vec<Occurrence> {
    if TimeRange::new(event.start, event.end).overlaps(range) {
        vec![event.to_occurrence()]
    } else {
        vec![]
    }
}

fn daily(event: &ParsedEvent, rule: &RecurrenceRule, range: &TimeRange) -> Vec<Occurrence> {
    let duration = event.end - event.start;
    let step = TimeDelta::days(i64::from(rule.interval()));
    let mut occurrences = Vec::new();
    let mut cursor = event.start;
    let mut count = 0;

    while cursor < range.end {
        if rule.is_after_until(cursor) {
            break;
        }
        if cursor >= range.start {
            occurrences.push(event.occurrence_at(cursor, duration));
        }
        // Steps before the window still consume COUNT.
        count += 1;
        if rule.count_reached(count) {
            break;
        }
        cursor += step;
    }
    occurrences
}

fn weekly(event: &ParsedEvent, rule: &RecurrenceRule, range: &TimeRange) -> Vec<Occurrence> {
    let duration = event.end - event.start;
    let interval = i64::from(rule.interval());
    // A BYDAY whose entries all failed to parse matches no weekday.
    let weekdays: Vec<Weekday> = match &rule.by_day {
        None => vec![event.start.weekday()],
        Some(entries) => entries.iter().map(|entry| entry.weekday).collect(),
    };

    let mut occurrences = Vec::new();
    let mut cursor = range.start.date().and_time(event.start.time());
    while cursor < range.end {
        if rule.is_after_until(cursor) {
            break;
        }
        let weeks = (cursor - event.start)
            .num_milliseconds()
            .div_euclid(7 * DAY_MS);
        if weeks >= 0
            && weeks % interval == 0
            && weekdays.contains(&cursor.weekday())
            && cursor >= event.start
        {
            occurrences.push(event.occurrence_at(cursor, duration));
        }
        cursor += TimeDelta::days(1);
    }
    occurrences
}

fn monthly(event: &ParsedEvent, rule: &RecurrenceRule, range: &TimeRange) -> Vec<Occurrence> {
    let interval = i64::from(rule.interval());
    let start_index = month_index(event.start);
    let mut collector = Collector::new(event, rule, range);

    for index in month_index(range.start)..=month_index(range.end) {
        if (index - start_index) % interval != 0 {
            continue;
        }
        let Ok(year) = i32::try_from(index.div_euclid(12)) else {
            continue;
        };
        let month0 = index.rem_euclid(12);

        let Some(entries) = &rule.by_day else {
            // Day-of-month is taken literally; day 31 in a shorter month
            // rolls over into the following month.
            let Some(date) = date_from_parts(year, month0, i64::from(event.start.day())) else {
                continue;
            };
            if collector.offer(date.and_time(event.start.time())).is_break() {
                break;
            }
            continue;
        };

        for entry in entries {
            // month0 is in 0..12 after rem_euclid.
            let Some(date) = nth_weekday_of_month(year, month0 as u32, entry.weekday, entry.ordinal)
            else {
                continue;
            };
            if collector.offer(date.and_time(event.start.time())).is_break() {
                return collector.finish();
            }
        }
    }
    collector.finish()
}

fn yearly(event: &ParsedEvent, rule: &RecurrenceRule, range: &TimeRange) -> Vec<Occurrence> {
    let interval = i64::from(rule.interval());
    let start_year = event.start.year();
    let mut collector = Collector::new(event, rule, range);

    for year in range.start.year()..=range.end.year() {
        if i64::from(year - start_year) % interval != 0 {
            continue;
        }

        match (&rule.by_day, &rule.by_month) {
            (Some(entries), Some(_)) => {
                // An unusable first BYMONTH never produces a date.
                let Some(month0) = rule.first_month0() else {
                    return collector.finish();
                };
                for entry in entries {
                    let Some(date) =
                        nth_weekday_of_month(year, month0, entry.weekday, entry.ordinal)
                    else {
                        continue;
                    };
                    if collector.offer(date.and_time(event.start.time())).is_break() {
                        return collector.finish();
                    }
                }
            }
            _ => {
                let Some(date) = date_from_parts(
                    year,
                    i64::from(event.start.month0()),
                    i64::from(event.start.day()),
                ) else {
                    continue;
                };
                if collector.offer(date.and_time(event.start.time())).is_break() {
                    break;
                }
            }
        }
    }
    collector.finish()
}

/// Shared candidate filter for MONTHLY and YEARLY: rejects candidates before
/// the event start or after UNTIL, keeps those inside the window and stops
/// once COUNT occurrences have been emitted.
struct Collector<'a> {
    event: &'a ParsedEvent,
    rule: &'a RecurrenceRule,
    range: &'a TimeRange,
    duration: TimeDelta,
    count: u32,
    occurrences: Vec<Occurrence>,
}

impl<'a> Collector<'a> {
    fn new(event: &'a ParsedEvent, rule: &'a RecurrenceRule, range: &'a TimeRange) -> Self {
        Self {
            event,
            rule,
            range,
            duration: event.end - event.start,
            count: 0,
            occurrences: Vec::new(),
        }
    }

    fn offer(&mut self, candidate: NaiveDateTime) -> ControlFlow<()> {
        if candidate < self.event.start || self.rule.is_after_until(candidate) {
            return ControlFlow::Continue(());
        }
        if self.range.contains(candidate) {
            self.occurrences
                .push(self.event.occurrence_at(candidate, self.duration));
            self.count += 1;
            if self.rule.count_reached(self.count) {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn finish(self) -> Vec<Occurrence> {
        self.occurrences
    }
}
