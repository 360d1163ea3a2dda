mod conversions;
mod types;

pub(crate) use conversions::*;
pub(crate) use types::*;

use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_router,
};
use tokio::sync::RwLock;

use crate::calendar::event::CalendarEvent;
use crate::calendar::time_utils::TimeRange;
use crate::calendar::{self, CalendarStore};
use crate::error::DashError;
use crate::fetch::HttpFetcher;
use crate::layout::timeline::events_on;
use crate::layout::{DayTimeline, MonthLayout, WeekTimeline};

#[derive(Clone)]
pub struct DashServer {
    store: Arc<RwLock<CalendarStore>>,
    fetcher: HttpFetcher,
}

impl ServerHandler for DashServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dashcal".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "dashcal aggregates ICS calendar feeds into one deduplicated, colour-coded event list \
                 for a wall dashboard. One month is loaded at a time; refresh_calendars switches months. \
                 Use month_layout for the month grid, week_timeline/day_timeline for hour-axis views, \
                 and toggle_calendar to hide or show a calendar in every view."
                    .into(),
            ),
        }
    }
}

// -- Tool implementations --

#[tool_router]
impl DashServer {
    pub fn new(store: CalendarStore, fetcher: HttpFetcher) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            fetcher,
        }
    }

    // === Sources ===

    #[tool(description = "List configured calendars with their index, name, colour, visibility and number of loaded events.")]
    async fn list_calendars(&self) -> Result<CallToolResult, McpError> {
        let store = self.store.read().await;
        let window = store.window();

        Ok(json_text(&serde_json::json!({
            "window": window,
            "timezone": store.zone().name(),
            "calendars": store.calendars(),
        })))
    }

    #[tool(description = "Add a calendar from raw ICS text. The calendar joins the aggregate at the next index and the loaded month is reloaded.")]
    async fn add_ics_source(
        &self,
        params: Parameters<AddIcsSourceParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        if params.ics_data.trim().is_empty() {
            return Err(dash_err(DashError::InvalidInput("ics_data is empty".to_string())));
        }
        let (index, window) = {
            let mut store = self.store.write().await;
            let index = store.add_inline_source(params.name, params.color, params.ics_data);
            (index, store.window())
        };
        self.reload(window).await;

        let store = self.store.read().await;
        let summary = store.calendars().into_iter().nth(index);
        Ok(json_text(&serde_json::json!({ "calendar": summary })))
    }

    #[tool(description = "Hide a visible calendar or show a hidden one. Hidden calendars are left out of every view.")]
    async fn toggle_calendar(
        &self,
        params: Parameters<ToggleCalendarParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut store = self.store.write().await;
        let hidden = store.toggle_hidden(params.0.index).map_err(dash_err)?;

        Ok(json_text(&serde_json::json!({
            "index": params.0.index,
            "hidden": hidden,
        })))
    }

    #[tool(description = "Fetch every calendar again for the given month and replace the loaded events.")]
    async fn refresh_calendars(
        &self,
        params: Parameters<RefreshParams>,
    ) -> Result<CallToolResult, McpError> {
        let window = month_window(params.0.year, params.0.month).map_err(dash_err)?;
        let published = self.reload(window).await;

        let store = self.store.read().await;
        Ok(json_text(&serde_json::json!({
            "published": published,
            "window": store.window(),
            "event_count": store.events().len(),
        })))
    }

    // === Queries ===

    #[tool(description = "List visible events, either for one day (YYYY-MM-DD) or for the whole loaded month. Events are deduplicated across calendars.")]
    async fn list_events(
        &self,
        params: Parameters<ListEventsParams>,
    ) -> Result<CallToolResult, McpError> {
        let events: Vec<CalendarEvent> = match params.0.date.as_deref() {
            Some(raw) => {
                let date = parse_date(raw).map_err(dash_err)?;
                self.ensure_window(window_for(date).map_err(dash_err)?).await?;
                let store = self.store.read().await;
                events_on(store.events(), date, store.hidden())
            }
            None => {
                let store = self.store.read().await;
                let mut events: Vec<CalendarEvent> = store.visible_events().cloned().collect();
                events.sort_by_key(|e| e.start);
                events
            }
        };

        Ok(json_text(&events))
    }

    #[tool(description = "Month grid: Sunday-first week rows with inline day events and up to two lanes of multi-day pills per week.")]
    async fn month_layout(
        &self,
        params: Parameters<MonthLayoutParams>,
    ) -> Result<CallToolResult, McpError> {
        let loaded = self.store.read().await.window().start.date();
        let year = params.0.year.unwrap_or(loaded.year());
        let month = params.0.month.unwrap_or(loaded.month());
        let window = month_window(year, month).map_err(dash_err)?;
        self.ensure_window(window).await?;

        let store = self.store.read().await;
        let layout = MonthLayout::build(store.events(), year, month - 1, store.hidden()).map_err(dash_err)?;
        Ok(json_text(&layout))
    }

    #[tool(description = "Hour-axis layout of one day: all-day events plus timed events packed into side-by-side columns.")]
    async fn day_timeline(
        &self,
        params: Parameters<TimelineParams>,
    ) -> Result<CallToolResult, McpError> {
        let date = parse_date(&params.0.date).map_err(dash_err)?;
        self.ensure_window(window_for(date).map_err(dash_err)?).await?;

        let store = self.store.read().await;
        Ok(json_text(&DayTimeline::build(store.events(), date, store.hidden())))
    }

    #[tool(description = "Hour-axis layout of the Sunday-first week containing the given day (YYYY-MM-DD).")]
    async fn week_timeline(
        &self,
        params: Parameters<TimelineParams>,
    ) -> Result<CallToolResult, McpError> {
        let date = parse_date(&params.0.date).map_err(dash_err)?;
        self.ensure_window(window_for(date).map_err(dash_err)?).await?;

        let store = self.store.read().await;
        Ok(json_text(&WeekTimeline::build(store.events(), date, store.hidden())))
    }
}

impl DashServer {
    pub fn into_router(self) -> rmcp::handler::server::router::Router<Self> {
        let mut router = rmcp::handler::server::router::Router::new(self);
        router.tool_router = Self::tool_router();
        router
    }

    async fn reload(&self, window: TimeRange) -> bool {
        calendar::refresh(&self.store, &self.fetcher, window).await
    }

    /// Load `window` unless it is already the loaded month.
    async fn ensure_window(&self, window: TimeRange) -> Result<(), McpError> {
        calendar::load_window(&self.store, &self.fetcher, window)
            .await
            .map_err(dash_err)
    }

    /// Reload the current month every `period` until the runtime shuts down.
    pub fn spawn_refresher(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let server = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let window = server.store.read().await.window();
                if !server.reload(window).await {
                    tracing::debug!("background refresh superseded");
                }
            }
        })
    }
}
