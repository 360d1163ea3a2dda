//! Turns published events into month-grid and timeline structures.

pub mod month;
pub mod timeline;

use std::collections::HashSet;

use crate::calendar::event::CalendarEvent;
use crate::calendar::time_utils::adjusted_end;

pub use month::MonthLayout;
pub use timeline::{DayTimeline, WeekTimeline};

fn visible<'a>(
    events: &'a [CalendarEvent],
    hidden: &'a HashSet<usize>,
) -> impl Iterator<Item = &'a CalendarEvent> {
    events
        .iter()
        .filter(move |e| !hidden.contains(&e.calendar_index))
}

/// Whether the month grid draws the event as a spanning pill rather than an
/// inline row. All-day events count even when they cover a single day.
pub fn is_multi_day(event: &CalendarEvent) -> bool {
    let same_day = event.start.date() == adjusted_end(event.end).date();
    !(same_day && event.days_spanned <= 1 && !event.is_all_day())
}
