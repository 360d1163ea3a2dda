use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::Serialize;

use super::{is_multi_day, visible};
use crate::calendar::event::CalendarEvent;
use crate::calendar::time_utils::{adjusted_end, days_in_month, start_of_day};
use crate::error::DashError;

/// Lanes of spanning pills drawn per week row.
pub const MAX_LANES: usize = 2;
/// Inline events a day cell shows before it scrolls.
pub const MAX_INLINE_EVENTS: usize = 3;

/// The part of a spanning event that falls inside one week row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct Segment {
    pub id: String,
    pub event_id: String,
    pub title: String,
    pub color: String,
    pub week_index: usize,
    /// 0 = Sunday.
    pub start_col: u32,
    pub span: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct DayCell {
    pub day: u32,
    pub events: Vec<CalendarEvent>,
    pub scrollable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct WeekRow {
    /// Seven cells, Sunday first; `None` outside the month.
    pub cells: Vec<Option<DayCell>>,
    pub lanes: Vec<Vec<Segment>>,
    /// Segments that did not fit in the drawn lanes.
    pub overflow: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct MonthLayout {
    pub year: i32,
    /// 1-based.
    pub month: u32,
    pub first_day_offset: u32,
    pub days_in_month: u32,
    pub weeks: Vec<WeekRow>,
}

impl MonthLayout {
    /// Lay out a month (`month0` zero-based), skipping hidden calendars.
    pub fn build(
        events: &[CalendarEvent],
        year: i32,
        month0: u32,
        hidden: &HashSet<usize>,
    ) -> Result<Self, DashError> {
        let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)
            .ok_or_else(|| DashError::InvalidDate(format!("{year}-{}", month0 + 1)))?;
        let first_day_offset = first.weekday().num_days_from_sunday();
        let last_day = days_in_month(year, month0);
        let week_count = (first_day_offset + last_day).div_ceil(7) as usize;

        let grid = MonthGrid {
            first,
            first_day_offset,
            last_day,
        };

        let mut by_week: Vec<Vec<Segment>> = vec![Vec::new(); week_count];
        for event in visible(events, hidden).filter(|e| is_multi_day(e)) {
            for segment in grid.segments(event) {
                by_week[segment.week_index].push(segment);
            }
        }

        let day_events: Vec<&CalendarEvent> = visible(events, hidden)
            .filter(|e| !e.is_all_day() && !is_multi_day(e))
            .collect();

        let weeks = by_week
            .into_iter()
            .enumerate()
            .map(|(week_index, segments)| {
                let total = segments.len();
                let mut lanes = pack_lanes(segments);
                lanes.truncate(MAX_LANES);
                let drawn: usize = lanes.iter().map(Vec::len).sum();

                let cells = (0..7)
                    .map(|col| {
                        let day = (week_index as i64) * 7 + col - i64::from(first_day_offset) + 1;
                        if day < 1 || day > i64::from(last_day) {
                            return None;
                        }
                        let day = day as u32;
                        let date = first.with_day(day)?;
                        Some(day_cell(day, date, &day_events))
                    })
                    .collect();

                WeekRow {
                    cells,
                    lanes,
                    overflow: total - drawn,
                }
            })
            .collect();

        Ok(Self {
            year,
            month: month0 + 1,
            first_day_offset,
            days_in_month: last_day,
            weeks,
        })
    }
}

struct MonthGrid {
    first: NaiveDate,
    first_day_offset: u32,
    last_day: u32,
}

impl MonthGrid {
    /// Clip `event` to the month and cut it at week-row boundaries.
    fn segments(&self, event: &CalendarEvent) -> Vec<Segment> {
        let month_start = start_of_day(self.first);
        let Some(last) = self.first.with_day(self.last_day) else {
            return Vec::new();
        };
        let month_end = last.and_time(NaiveTime::MIN) + chrono::TimeDelta::milliseconds(86_399_999);

        let end = adjusted_end(event.end);
        if end < month_start || event.start > month_end {
            return Vec::new();
        }

        let start_day = if event.start < month_start {
            1
        } else {
            event.start.day()
        };
        let end_day = if end > month_end { self.last_day } else { end.day() };

        let mut segments = Vec::new();
        let mut cursor = start_day;
        while cursor <= end_day {
            let slot = self.first_day_offset + cursor - 1;
            let week_index = slot / 7;
            let week_end_day = week_index * 7 + 7 - self.first_day_offset;
            let segment_end = end_day.min(week_end_day);

            segments.push(Segment {
                id: format!("{}-{cursor}", event.id),
                event_id: event.id.clone(),
                title: event.title.clone(),
                color: event.color.clone(),
                week_index: week_index as usize,
                start_col: slot % 7,
                span: segment_end - cursor + 1,
            });
            cursor = segment_end + 1;
        }
        segments
    }
}

/// Greedy lane assignment: each segment goes into the first lane whose last
/// occupied column is left of it.
pub fn pack_lanes(mut segments: Vec<Segment>) -> Vec<Vec<Segment>> {
    segments.sort_by_key(|s| (s.start_col, Reverse(s.span)));

    let mut lanes: Vec<Vec<Segment>> = Vec::new();
    let mut lane_ends: Vec<u32> = Vec::new();
    for segment in segments {
        let end = segment.start_col + segment.span - 1;
        match lane_ends.iter().position(|&last| segment.start_col > last) {
            Some(lane) => {
                lane_ends[lane] = end;
                lanes[lane].push(segment);
            }
            None => {
                lane_ends.push(end);
                lanes.push(vec![segment]);
            }
        }
    }
    lanes
}

fn day_cell(day: u32, date: NaiveDate, day_events: &[&CalendarEvent]) -> DayCell {
    let mut events: Vec<CalendarEvent> = day_events
        .iter()
        .filter(|e| e.start.date() == date)
        .map(|e| (*e).clone())
        .collect();
    events.sort_by_key(|e| e.start);

    DayCell {
        day,
        scrollable: events.len() > MAX_INLINE_EVENTS,
        events,
    }
}
