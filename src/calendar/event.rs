use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::time_utils::is_midnight;

/// One VEVENT as read from a feed, before recurrence expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub rrule: Option<String>,
    pub all_day: Option<bool>,
    pub location: Option<String>,
}

/// A concrete instance of a (possibly recurring) event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: Option<String>,
    pub all_day: bool,
}

impl ParsedEvent {
    pub fn to_occurrence(&self) -> Occurrence {
        Occurrence {
            title: self.title.clone(),
            start: self.start,
            end: self.end,
            location: self.location.clone(),
            all_day: self.all_day.unwrap_or(false),
        }
    }

    /// An occurrence starting at `start` that keeps this event's span.
    pub fn occurrence_at(&self, start: NaiveDateTime, duration: TimeDelta) -> Occurrence {
        Occurrence {
            start,
            end: start + duration,
            ..self.to_occurrence()
        }
    }
}

/// A render-ready event attributed to one configured calendar source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: Option<String>,
    pub color: String,
    pub calendar_index: usize,
    pub days_spanned: i64,
    pub all_day: bool,
}

impl CalendarEvent {
    /// Flagged all-day, or spanning whole days from midnight to midnight.
    pub fn is_all_day(&self) -> bool {
        self.all_day || (is_midnight(self.start) && is_midnight(self.end))
    }
}
