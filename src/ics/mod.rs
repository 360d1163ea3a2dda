//! Best-effort VEVENT extraction from raw iCalendar text.
//!
//! Malformed or unrecognized lines are skipped and blocks missing a summary or
//! start are dropped; parsing never fails.

pub mod codec;
pub mod line;

use std::collections::HashSet;

use chrono::{NaiveDateTime, TimeDelta};
use chrono_tz::Tz;

use crate::calendar::event::ParsedEvent;
use codec::{parse_duration_ms, parse_ics_date};
use line::{IcsLine, PropertyKind, has_date_value_param, logical_lines};

const CANCELLED: &str = "CANCELLED";

/// Parse every VEVENT in `text`. Date-times marked UTC are converted into
/// `zone`; floating ones are kept as written.
pub fn parse_ics(text: &str, zone: Tz) -> Vec<ParsedEvent> {
    let lines = logical_lines(text);
    let classified: Vec<IcsLine<'_>> = lines.iter().map(|l| IcsLine::classify(l)).collect();

    // A cancelled instance may be its own VEVENT, before or after the
    // definition it cancels, so collect those UIDs up front.
    let cancelled = cancelled_uids(&classified);

    let mut events = Vec::new();
    let mut current: Option<EventBuilder> = None;
    for line in &classified {
        match *line {
            IcsLine::BeginEvent => current = Some(EventBuilder::default()),
            IcsLine::EndEvent => {
                if let Some(event) = current.take().and_then(|b| b.build(&cancelled)) {
                    events.push(event);
                }
            }
            IcsLine::Property { kind, params, value } => {
                if let Some(builder) = current.as_mut() {
                    builder.apply(kind, params, value, zone);
                }
            }
            IcsLine::Other => {}
        }
    }

    tracing::debug!(
        events = events.len(),
        cancelled = cancelled.len(),
        "parsed calendar feed"
    );
    events
}

fn cancelled_uids(lines: &[IcsLine<'_>]) -> HashSet<String> {
    let mut cancelled = HashSet::new();
    let mut in_event = false;
    let mut uid: Option<&str> = None;
    let mut status: Option<&str> = None;

    for line in lines {
        match *line {
            IcsLine::BeginEvent => {
                in_event = true;
                uid = None;
                status = None;
            }
            IcsLine::EndEvent => {
                if let (Some(uid), Some(CANCELLED)) = (uid, status) {
                    cancelled.insert(uid.to_string());
                }
                in_event = false;
            }
            IcsLine::Property { kind: PropertyKind::Uid, value, .. } if in_event => uid = Some(value),
            IcsLine::Property { kind: PropertyKind::Status, value, .. } if in_event => {
                status = Some(value)
            }
            _ => {}
        }
    }
    cancelled
}

/// Undo ICS TEXT escaping. Line breaks become ", " so a multi-line
/// address reads as one line.
pub fn unescape_text(raw: &str) -> String {
    raw.replace("\\n", ", ")
        .replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\\\", "\\")
        .trim()
        .to_string()
}

#[derive(Debug, Default)]
struct EventBuilder {
    title: Option<String>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    all_day: Option<bool>,
    rrule: Option<String>,
    duration_ms: Option<i64>,
    location: Option<String>,
    uid: Option<String>,
    status: Option<String>,
}

impl EventBuilder {
    fn apply(&mut self, kind: PropertyKind, params: &str, value: &str, zone: Tz) {
        match kind {
            PropertyKind::Summary => self.title = Some(value.to_string()),
            PropertyKind::DtStart => {
                self.all_day = Some(has_date_value_param(params));
                self.start = parse_ics_date(value, zone);
            }
            PropertyKind::DtEnd => {
                if self.all_day.is_none() {
                    self.all_day = Some(has_date_value_param(params));
                }
                self.end = parse_ics_date(value, zone);
            }
            PropertyKind::RRule => self.rrule = Some(value.to_string()),
            PropertyKind::Duration => self.duration_ms = Some(parse_duration_ms(value)),
            PropertyKind::Location => self.location = Some(unescape_text(value)),
            PropertyKind::Uid => self.uid = Some(value.to_string()),
            PropertyKind::Status => self.status = Some(value.to_string()),
        }
    }

    fn build(self, cancelled: &HashSet<String>) -> Option<ParsedEvent> {
        let title = self.title.filter(|t| !t.is_empty())?;
        let start = self.start?;

        if self.status.as_deref() == Some(CANCELLED) {
            return None;
        }
        if self.uid.as_ref().is_some_and(|uid| cancelled.contains(uid)) {
            return None;
        }

        let end = match self.end {
            Some(end) => end,
            None => self
                .duration_ms
                .filter(|ms| *ms != 0)
                .and_then(TimeDelta::try_milliseconds)
                .and_then(|d| start.checked_add_signed(d))
                .or_else(|| {
                    let fallback = if self.all_day == Some(true) {
                        TimeDelta::days(1)
                    } else {
                        TimeDelta::hours(1)
                    };
                    start.checked_add_signed(fallback)
                })?,
        };

        Some(ParsedEvent {
            title,
            start,
            end,
            rrule: self.rrule,
            all_day: self.all_day,
            location: self.location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn parse_simple_event() {
        let ics = "BEGIN:VCALENDAR\r\n\
            VERSION:2.0\r\n\
            BEGIN:VEVENT\r\n\
            SUMMARY:Team Standup\r\n\
            DTSTART:20250115T090000Z\r\n\
            DTEND:20250115T093000Z\r\n\
            END:VEVENT\r\n\
            END:VCALENDAR\r\n";

        let events = parse_ics(ics, Tz::UTC);
        assert_eq!(
            events,
            vec![ParsedEvent {
                title: "Team Standup".to_string(),
                start: at(2025, 1, 15, 9, 0),
                end: at(2025, 1, 15, 9, 30),
                rrule: None,
                all_day: Some(false),
                location: None,
            }]
        );
    }

    #[test]
    fn parse_event_with_rrule_and_folded_summary() {
        let ics = "BEGIN:VEVENT\r\n\
            SUMMARY:Daily stand\r\n up meeting\r\n\
            DTSTART:20250115T090000\r\n\
            DTEND:20250115T091500\r\n\
            RRULE:FREQ=DAILY;COUNT=5\r\n\
            END:VEVENT\r\n";

        let events = parse_ics(ics, Tz::UTC);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Daily standup meeting");
        assert_eq!(events[0].rrule.as_deref(), Some("FREQ=DAILY;COUNT=5"));
    }

    #[test]
    fn all_day_event_defaults_to_one_day() {
        let ics = "BEGIN:VEVENT\n\
            SUMMARY:Holiday\n\
            DTSTART;VALUE=DATE:20251225\n\
            END:VEVENT\n";

        let events = parse_ics(ics, Tz::UTC);
        assert_eq!(events[0].all_day, Some(true));
        assert_eq!(events[0].start, at(2025, 12, 25, 0, 0));
        assert_eq!(events[0].end, at(2025, 12, 26, 0, 0));
    }

    #[test]
    fn duration_resolves_end() {
        let ics = "BEGIN:VEVENT\n\
            SUMMARY:Workshop\n\
            DTSTART:20250301T130000\n\
            DURATION:PT2H30M\n\
            END:VEVENT\n";

        let events = parse_ics(ics, Tz::UTC);
        assert_eq!(events[0].end, at(2025, 3, 1, 15, 30));
    }

    #[test]
    fn unrepresentable_duration_falls_back_to_default_length() {
        let ics = "BEGIN:VEVENT\n\
            SUMMARY:Long\n\
            DTSTART:20250601T100000\n\
            DURATION:P999999999D\n\
            END:VEVENT\n\
            BEGIN:VEVENT\n\
            SUMMARY:Longer\n\
            DTSTART;VALUE=DATE:20250601\n\
            DURATION:P99999999999999D\n\
            END:VEVENT\n";

        let events = parse_ics(ics, Tz::UTC);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].end, at(2025, 6, 1, 11, 0));
        assert_eq!(events[1].end, at(2025, 6, 2, 0, 0));
    }

    #[test]
    fn timed_event_without_end_lasts_an_hour() {
        let ics = "BEGIN:VEVENT\n\
            SUMMARY:Call\n\
            DTSTART;TZID=Europe/London:20250301T130000\n\
            END:VEVENT\n";

        let events = parse_ics(ics, Tz::UTC);
        assert_eq!(events[0].start, at(2025, 3, 1, 13, 0));
        assert_eq!(events[0].end, at(2025, 3, 1, 14, 0));
        assert_eq!(events[0].all_day, Some(false));
    }

    #[test]
    fn dtend_sets_all_day_only_when_dtstart_has_not() {
        let ics = "BEGIN:VEVENT\n\
            SUMMARY:Trip\n\
            DTEND;VALUE=DATE:20250305\n\
            DTSTART;VALUE=DATE:20250301\n\
            END:VEVENT\n\
            BEGIN:VEVENT\n\
            SUMMARY:Odd\n\
            DTSTART:20250301T100000\n\
            DTEND;VALUE=DATE:20250302\n\
            END:VEVENT\n";

        let events = parse_ics(ics, Tz::UTC);
        assert_eq!(events[0].all_day, Some(true));
        assert_eq!(events[0].end, at(2025, 3, 5, 0, 0));
        assert_eq!(events[1].all_day, Some(false));
    }

    #[test]
    fn events_missing_summary_or_start_are_dropped() {
        let ics = "BEGIN:VEVENT\n\
            DTSTART:20250301T100000\n\
            END:VEVENT\n\
            BEGIN:VEVENT\n\
            SUMMARY:No start\n\
            END:VEVENT\n\
            BEGIN:VEVENT\n\
            SUMMARY:Bad start\n\
            DTSTART:2025-03-01\n\
            END:VEVENT\n\
            BEGIN:VEVENT\n\
            SUMMARY:Kept\n\
            DTSTART:20250301T100000\n\
            END:VEVENT\n";

        let events = parse_ics(ics, Tz::UTC);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Kept");
    }

    #[test]
    fn cancellation_suppresses_every_event_with_that_uid() {
        let ics = "BEGIN:VEVENT\n\
            UID:abc@example.com\n\
            SUMMARY:Weekly sync\n\
            DTSTART:20250303T100000\n\
            RRULE:FREQ=WEEKLY\n\
            END:VEVENT\n\
            BEGIN:VEVENT\n\
            UID:other@example.com\n\
            SUMMARY:Lunch\n\
            DTSTART:20250303T120000\n\
            END:VEVENT\n\
            BEGIN:VEVENT\n\
            UID:abc@example.com\n\
            SUMMARY:Weekly sync\n\
            DTSTART:20250310T100000\n\
            STATUS:CANCELLED\n\
            END:VEVENT\n";

        let events = parse_ics(ics, Tz::UTC);
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Lunch"]);
    }

    #[test]
    fn cancelled_event_without_uid_is_dropped() {
        let ics = "BEGIN:VEVENT\n\
            SUMMARY:Off\n\
            DTSTART:20250303T100000\n\
            STATUS:CANCELLED\n\
            END:VEVENT\n";

        assert!(parse_ics(ics, Tz::UTC).is_empty());
    }

    #[test]
    fn location_is_unescaped() {
        let ics = "BEGIN:VEVENT\n\
            SUMMARY:Dinner\n\
            DTSTART:20250303T190000\n\
            LOCATION:Luigi's\\, 12 Main St\\nSpringfield \n\
            END:VEVENT\n";

        let events = parse_ics(ics, Tz::UTC);
        assert_eq!(
            events[0].location.as_deref(),
            Some("Luigi's, 12 Main St, Springfield")
        );
    }

    #[test]
    fn utc_times_are_shifted_into_display_zone() {
        let ics = "BEGIN:VEVENT\n\
            SUMMARY:Launch\n\
            DTSTART:20250615T140000Z\n\
            DTEND:20250615T150000Z\n\
            END:VEVENT\n";

        let events = parse_ics(ics, chrono_tz::America::Los_Angeles);
        assert_eq!(events[0].start, at(2025, 6, 15, 7, 0));
        assert_eq!(events[0].end, at(2025, 6, 15, 8, 0));
    }

    #[test]
    fn garbage_produces_no_events() {
        assert!(parse_ics("not valid ical data", Tz::UTC).is_empty());
        assert!(parse_ics("", Tz::UTC).is_empty());
        assert!(parse_ics("END:VEVENT\nSUMMARY:stray\n", Tz::UTC).is_empty());
    }
}
