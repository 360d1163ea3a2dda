pub mod aggregate;
pub mod event;
pub mod expand;
pub mod rrule;
pub mod time_utils;

use std::collections::HashSet;

use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::DashError;
use aggregate::{CalendarSource, Feed, FeedFetcher, default_palette, run_fetch_cycle};
use event::CalendarEvent;
use time_utils::TimeRange;

/// Issued when a refresh cycle starts; only the newest ticket may publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTicket {
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct CalendarSummary {
    pub index: usize,
    pub name: String,
    pub color: String,
    pub inline: bool,
    pub hidden: bool,
    pub event_count: usize,
}

#[derive(Debug)]
pub struct CalendarStore {
    sources: Vec<CalendarSource>,
    palette: Vec<String>,
    zone: Tz,
    hidden: HashSet<usize>,
    window: TimeRange,
    events: Vec<CalendarEvent>,
    generation: u64,
}

impl CalendarStore {
    pub fn new(sources: Vec<CalendarSource>, palette: Vec<String>, zone: Tz, window: TimeRange) -> Self {
        let palette = if palette.is_empty() {
            default_palette()
        } else {
            palette
        };
        Self {
            sources,
            palette,
            zone,
            hidden: HashSet::new(),
            window,
            events: Vec::new(),
            generation: 0,
        }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn window(&self) -> TimeRange {
        self.window
    }

    pub fn hidden(&self) -> &HashSet<usize> {
        &self.hidden
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    /// Published events whose calendar is not hidden.
    pub fn visible_events(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.events
            .iter()
            .filter(|e| !self.hidden.contains(&e.calendar_index))
    }

    pub fn color_for(&self, index: usize) -> String {
        self.sources
            .get(index)
            .and_then(|s| s.color.clone())
            .unwrap_or_else(|| self.palette[index % self.palette.len()].clone())
    }

    pub fn calendars(&self) -> Vec<CalendarSummary> {
        self.sources
            .iter()
            .enumerate()
            .map(|(index, source)| CalendarSummary {
                index,
                name: source.name.clone(),
                color: self.color_for(index),
                inline: matches!(source.feed, Feed::Inline(_)),
                hidden: self.hidden.contains(&index),
                event_count: self.events.iter().filter(|e| e.calendar_index == index).count(),
            })
            .collect()
    }

    /// Flip a calendar's visibility. Returns whether it is now hidden.
    pub fn toggle_hidden(&mut self, index: usize) -> Result<bool, DashError> {
        if index >= self.sources.len() {
            return Err(DashError::CalendarNotFound(index.to_string()));
        }
        if self.hidden.remove(&index) {
            Ok(false)
        } else {
            self.hidden.insert(index);
            Ok(true)
        }
    }

    /// Register ICS text supplied directly by a client. Returns its index.
    pub fn add_inline_source(&mut self, name: Option<String>, color: Option<String>, ics: String) -> usize {
        let index = self.sources.len();
        self.sources.push(CalendarSource {
            name: name.unwrap_or_else(|| format!("Calendar {}", index + 1)),
            color,
            feed: Feed::Inline(ics),
        });
        index
    }

    pub fn begin_cycle(&mut self) -> CycleTicket {
        self.generation += 1;
        CycleTicket {
            generation: self.generation,
        }
    }

    /// Replace the published events with a cycle's results, unless a newer
    /// cycle has started since `ticket` was issued.
    pub fn publish(&mut self, ticket: CycleTicket, window: TimeRange, events: Vec<CalendarEvent>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "dropping results of superseded refresh"
            );
            return false;
        }
        self.window = window;
        self.events = events;
        true
    }
}

/// Refresh cycles `load_window` runs before giving up.
const LOAD_ATTEMPTS: usize = 3;

/// Make `window` the loaded window. A cycle whose results are dropped
/// because another refresh started meanwhile is retried; if the store still
/// holds a different window afterwards the caller gets an error rather than
/// stale events.
pub async fn load_window<F: FeedFetcher>(
    store: &RwLock<CalendarStore>,
    fetcher: &F,
    window: TimeRange,
) -> Result<(), DashError> {
    for attempt in 0..LOAD_ATTEMPTS {
        if store.read().await.window() == window {
            return Ok(());
        }
        if attempt > 0 {
            tracing::debug!(attempt, "window load superseded, retrying");
        }
        refresh(store, fetcher, window).await;
    }
    if store.read().await.window() == window {
        return Ok(());
    }
    Err(DashError::Refresh(format!(
        "{} did not load after {LOAD_ATTEMPTS} attempts",
        window.start.format("%Y-%m")
    )))
}

/// Run one refresh cycle for `window` against the shared store. The lock is
/// not held while feeds are fetched.
pub async fn refresh<F: FeedFetcher>(
    store: &RwLock<CalendarStore>,
    fetcher: &F,
    window: TimeRange,
) -> bool {
    let (ticket, sources, palette, zone) = {
        let mut guard = store.write().await;
        let ticket = guard.begin_cycle();
        (ticket, guard.sources.clone(), guard.palette.clone(), guard.zone)
    };

    let events = run_fetch_cycle(fetcher, &sources, palette, zone, &window).await;
    store.write().await.publish(ticket, window, events)
}
