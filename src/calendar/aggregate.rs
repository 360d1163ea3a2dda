use std::borrow::Cow;
use std::collections::HashSet;
use std::future::Future;

use chrono::NaiveDateTime;
use chrono_tz::Tz;

use super::event::{CalendarEvent, Occurrence};
use super::expand::expand_event;
use super::time_utils::{TimeRange, days_spanned, epoch_ms};
use crate::error::DashError;
use crate::ics::parse_ics;

pub const DEFAULT_PALETTE: [&str; 6] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F",
];

pub fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
}

/// Where a source's ICS text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    Url(String),
    /// ICS text handed to us directly; never fetched.
    Inline(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSource {
    pub name: String,
    /// Overrides the palette colour for this source.
    pub color: Option<String>,
    pub feed: Feed,
}

/// Retrieves raw ICS text for a feed URL.
pub trait FeedFetcher {
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String, DashError>> + Send;
}

/// Collects the events of one refresh cycle across all sources.
#[derive(Debug)]
pub struct EventAggregator {
    palette: Vec<String>,
    zone: Tz,
    sequence: u64,
    events: Vec<CalendarEvent>,
}

impl EventAggregator {
    pub fn new(palette: Vec<String>, zone: Tz) -> Self {
        let palette = if palette.is_empty() {
            default_palette()
        } else {
            palette
        };
        Self {
            palette,
            zone,
            sequence: 0,
            events: Vec::new(),
        }
    }

    /// Parse one source's ICS text and add its occurrences inside `window`.
    /// Returns how many occurrences were added.
    pub fn add_source(&mut self, index: usize, ics: &str, window: &TimeRange) -> usize {
        let color = self.palette_color(index);
        self.add_colored_source(index, &color, ics, window)
    }

    pub fn add_colored_source(
        &mut self,
        index: usize,
        color: &str,
        ics: &str,
        window: &TimeRange,
    ) -> usize {
        let before = self.events.len();
        for event in parse_ics(ics, self.zone) {
            for occurrence in expand_event(&event, window, self.zone) {
                self.push(index, color, occurrence);
            }
        }
        self.events.len() - before
    }

    pub fn palette_color(&self, index: usize) -> String {
        self.palette[index % self.palette.len()].clone()
    }

    fn push(&mut self, index: usize, color: &str, occurrence: Occurrence) {
        let id = format!(
            "{index}-{}-{}-{}",
            occurrence.title,
            epoch_ms(occurrence.start),
            self.sequence
        );
        self.sequence += 1;

        self.events.push(CalendarEvent {
            id,
            days_spanned: days_spanned(occurrence.start, occurrence.end),
            title: occurrence.title,
            start: occurrence.start,
            end: occurrence.end,
            location: occurrence.location,
            color: color.to_string(),
            calendar_index: index,
            all_day: occurrence.all_day,
        });
    }

    /// The cycle's events with title/start duplicates removed.
    pub fn finish(self) -> Vec<CalendarEvent> {
        dedup_events(self.events)
    }
}

/// Keep the first event for each `(title, start)` pair, across sources.
pub fn dedup_events(events: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
    let mut seen: HashSet<(String, NaiveDateTime)> = HashSet::new();
    events
        .into_iter()
        .filter(|event| seen.insert((event.title.clone(), event.start)))
        .collect()
}

/// Fetch, parse and expand every source in order. A source that fails to
/// fetch contributes nothing; the others are still aggregated.
pub async fn run_fetch_cycle<F: FeedFetcher>(
    fetcher: &F,
    sources: &[CalendarSource],
    palette: Vec<String>,
    zone: Tz,
    window: &TimeRange,
) -> Vec<CalendarEvent> {
    let mut aggregator = EventAggregator::new(palette, zone);

    for (index, source) in sources.iter().enumerate() {
        let text: Cow<'_, str> = match &source.feed {
            Feed::Inline(text) => Cow::Borrowed(text),
            Feed::Url(url) => match fetcher.fetch_text(url).await {
                Ok(text) => Cow::Owned(text),
                Err(e) => {
                    tracing::warn!(calendar = %source.name, "Skipping calendar: {e}");
                    continue;
                }
            },
        };
        let added = match &source.color {
            Some(color) => aggregator.add_colored_source(index, color, &text, window),
            None => aggregator.add_source(index, &text, window),
        };
        tracing::debug!(calendar = %source.name, occurrences = added, "expanded calendar");
    }

    let events = aggregator.finish();
    tracing::info!(
        sources = sources.len(),
        events = events.len(),
        "calendar cycle complete"
    );
    events
}
