use schemars::JsonSchema;
use serde::Deserialize;

// -- Tool parameter structs --

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct AddIcsSourceParams {
    #[schemars(description = "The iCal/ICS data as a string")]
    pub(crate) ics_data: String,
    #[schemars(description = "Display name. Defaults to 'Calendar N'.")]
    pub(crate) name: Option<String>,
    #[schemars(description = "Hex colour such as '#4ECDC4'. Defaults to the palette colour for the calendar's position.")]
    pub(crate) color: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ToggleCalendarParams {
    #[schemars(description = "Zero-based calendar index as returned by list_calendars")]
    pub(crate) index: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct RefreshParams {
    #[schemars(description = "Year of the month to load, e.g. 2025")]
    pub(crate) year: i32,
    #[schemars(description = "Month to load, 1-12")]
    pub(crate) month: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ListEventsParams {
    #[schemars(description = "Only events touching this day (YYYY-MM-DD). If omitted, every event in the loaded month.")]
    pub(crate) date: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct MonthLayoutParams {
    #[schemars(description = "Year. Defaults to the loaded month's year.")]
    pub(crate) year: Option<i32>,
    #[schemars(description = "Month, 1-12. Defaults to the loaded month.")]
    pub(crate) month: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct TimelineParams {
    #[schemars(description = "Day to lay out (YYYY-MM-DD)")]
    pub(crate) date: String,
}
