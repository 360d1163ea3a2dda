use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::Serialize;

use super::visible;
use crate::calendar::event::CalendarEvent;
use crate::calendar::time_utils::{TimeRange, start_of_day};

pub const PX_PER_HOUR: u32 = 60;
pub const MIN_HEIGHT_PX: u32 = 30;

/// Vertical placement of an event on a day's hour axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct TimelinePosition {
    pub start_minute: u32,
    pub end_minute: u32,
    pub top_px: u32,
    pub height_px: u32,
}

impl TimelinePosition {
    /// Half-open overlap on the clamped minute ranges.
    pub fn overlaps(&self, other: &TimelinePosition) -> bool {
        self.start_minute < other.end_minute && other.start_minute < self.end_minute
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct TimedEvent {
    pub event: CalendarEvent,
    pub position: TimelinePosition,
    pub column: usize,
    pub total_columns: usize,
    pub width_percent: f64,
    pub left_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct DayTimeline {
    pub date: NaiveDate,
    pub all_day: Vec<CalendarEvent>,
    pub timed: Vec<TimedEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct WeekTimeline {
    pub days: Vec<DayTimeline>,
}

impl DayTimeline {
    pub fn build(events: &[CalendarEvent], date: NaiveDate, hidden: &HashSet<usize>) -> Self {
        let (all_day, timed): (Vec<CalendarEvent>, Vec<CalendarEvent>) = events_on(events, date, hidden)
            .into_iter()
            .partition(CalendarEvent::is_all_day);

        Self {
            date,
            all_day,
            timed: pack_columns(timed, date),
        }
    }
}

impl WeekTimeline {
    /// The Sunday-first week containing `date`.
    pub fn build(events: &[CalendarEvent], date: NaiveDate, hidden: &HashSet<usize>) -> Self {
        Self {
            days: week_days(date)
                .into_iter()
                .map(|day| DayTimeline::build(events, day, hidden))
                .collect(),
        }
    }
}

pub fn week_days(date: NaiveDate) -> Vec<NaiveDate> {
    let sunday = date - TimeDelta::days(i64::from(date.weekday().num_days_from_sunday()));
    sunday.iter_days().take(7).collect()
}

/// Visible events touching `date`, earliest first.
pub fn events_on(events: &[CalendarEvent], date: NaiveDate, hidden: &HashSet<usize>) -> Vec<CalendarEvent> {
    let day = day_range(date);
    let mut on_day: Vec<CalendarEvent> = visible(events, hidden)
        .filter(|e| e.start < day.end && e.end > day.start)
        .cloned()
        .collect();
    on_day.sort_by_key(|e| e.start);
    on_day
}

fn day_range(date: NaiveDate) -> TimeRange {
    let start = start_of_day(date);
    TimeRange::new(start, start + TimeDelta::days(1))
}

/// Place `event` on `date`'s axis, clamped to `[00:00, 23:59:59.999]`.
pub fn position(event: &CalendarEvent, date: NaiveDate) -> TimelinePosition {
    let day = day_range(date);
    let last_instant = day.end - TimeDelta::milliseconds(1);

    let start = event.start.max(day.start);
    let end = event.end.min(last_instant);
    let start_minute = minute_of_day(start);
    let end_minute = minute_of_day(end);
    let duration = end_minute.saturating_sub(start_minute);

    TimelinePosition {
        start_minute,
        end_minute,
        top_px: start_minute * PX_PER_HOUR / 60,
        height_px: (duration * PX_PER_HOUR / 60).max(MIN_HEIGHT_PX),
    }
}

fn minute_of_day(instant: NaiveDateTime) -> u32 {
    instant.hour() * 60 + instant.minute()
}

/// Assign each timed event to the first column where it overlaps nothing.
/// Every event on the day shares the same column width.
pub fn pack_columns(events: Vec<CalendarEvent>, date: NaiveDate) -> Vec<TimedEvent> {
    let mut placed: Vec<(CalendarEvent, TimelinePosition)> = events
        .into_iter()
        .map(|e| {
            let pos = position(&e, date);
            (e, pos)
        })
        .collect();
    placed.sort_by_key(|(_, pos)| (pos.start_minute, Reverse(pos.height_px)));

    let mut columns: Vec<Vec<TimelinePosition>> = Vec::new();
    let mut assigned = Vec::with_capacity(placed.len());
    for (_, pos) in &placed {
        let free = columns
            .iter()
            .position(|column| column.iter().all(|other| !other.overlaps(pos)));
        let column = match free {
            Some(index) => index,
            None => {
                columns.push(Vec::new());
                columns.len() - 1
            }
        };
        columns[column].push(*pos);
        assigned.push(column);
    }

    let total_columns = columns.len();
    let width_percent = if total_columns == 0 {
        100.0
    } else {
        100.0 / total_columns as f64
    };

    placed
        .into_iter()
        .zip(assigned)
        .map(|((event, position), column)| TimedEvent {
            event,
            position,
            column,
            total_columns,
            width_percent,
            left_percent: column as f64 * width_percent,
        })
        .collect()
}
