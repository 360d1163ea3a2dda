mod calendar;
mod config;
mod error;
mod fetch;
mod ics;
mod layout;
mod server;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use rmcp::ServiceExt;

use calendar::CalendarStore;
use calendar::time_utils::TimeRange;
use config::Config;
use fetch::HttpFetcher;

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr; stdout is the MCP stdio transport
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting dashcal MCP server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load().context("Failed to load configuration")?;
    let today = Utc::now().with_timezone(&config.timezone).date_naive();
    let window = TimeRange::month(today.year(), today.month0())
        .context("Current month is out of range")?;

    tracing::info!(
        calendars = config.calendars.len(),
        timezone = config.timezone.name(),
        "Loaded configuration"
    );

    let store = CalendarStore::new(config.sources(), config.palette(), config.timezone, window);
    let server = server::DashServer::new(store, HttpFetcher::new()?);
    // The first tick fires immediately and performs the initial load.
    let _refresher = server.spawn_refresher(config.refresh_interval);

    let router = server.into_router();
    let service = router.serve(rmcp::transport::io::stdio()).await?;

    tracing::info!("dashcal is ready");
    service.waiting().await?;

    Ok(())
}
