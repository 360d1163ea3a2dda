use chrono::{Datelike, NaiveDate};
use rmcp::{ErrorData as McpError, model::*};
use serde::Serialize;

use crate::calendar::time_utils::TimeRange;
use crate::error::DashError;

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, DashError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        DashError::InvalidDate(format!("Cannot parse date: '{s}'. Use YYYY-MM-DD."))
    })
}

/// Window for a 1-based month.
pub(crate) fn month_window(year: i32, month: u32) -> Result<TimeRange, DashError> {
    if !(1..=12).contains(&month) {
        return Err(DashError::InvalidDate(format!("Month must be 1-12, got {month}")));
    }
    TimeRange::month(year, month - 1)
        .ok_or_else(|| DashError::InvalidDate(format!("{year}-{month:02}")))
}

/// Window for the month containing `date`.
pub(crate) fn window_for(date: NaiveDate) -> Result<TimeRange, DashError> {
    month_window(date.year(), date.month())
}

pub(crate) fn dash_err(e: DashError) -> McpError {
    let code = match &e {
        DashError::CalendarNotFound(_) => ErrorCode::RESOURCE_NOT_FOUND,
        DashError::Fetch { .. } | DashError::Config(_) | DashError::Refresh(_) => {
            ErrorCode::INTERNAL_ERROR
        }
        DashError::InvalidDate(_) | DashError::InvalidInput(_) => ErrorCode::INVALID_PARAMS,
    };
    McpError::new(code, e.to_string(), None::<serde_json::Value>)
}

pub(crate) fn json_text<T: Serialize>(value: &T) -> CallToolResult {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string());
    CallToolResult::success(vec![Content::text(json)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn parse_date_accepts_iso_days() {
        assert_eq!(
            parse_date(" 2025-06-14 ").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
        );
    }

    #[test]
    fn parse_date_rejects_other_shapes() {
        assert!(matches!(parse_date("14/06/2025"), Err(DashError::InvalidDate(_))));
        assert!(matches!(parse_date("2025-02-30"), Err(DashError::InvalidDate(_))));
    }

    #[test]
    fn month_window_is_one_based() {
        let window = month_window(2025, 12).unwrap();
        assert_eq!(window.start.date(), NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(window.end.date(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(window.end.time(), NaiveTime::MIN);
        assert!(month_window(2025, 0).is_err());
        assert!(month_window(2025, 13).is_err());
    }

    #[test]
    fn window_for_uses_the_containing_month() {
        let window = window_for(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).unwrap();
        assert_eq!(window, month_window(2024, 2).unwrap());
    }

    #[test]
    fn dash_err_maps_not_found_to_resource_not_found() {
        let err = dash_err(DashError::CalendarNotFound("3".to_string()));
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
    }

    #[test]
    fn dash_err_maps_bad_dates_to_invalid_params() {
        let err = dash_err(DashError::InvalidDate("bad".to_string()));
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn dash_err_maps_fetch_failures_to_internal_error() {
        let err = dash_err(DashError::Fetch {
            url: "https://example.com".to_string(),
            reason: "timeout".to_string(),
        });
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    }

    #[test]
    fn dash_err_maps_superseded_reloads_to_internal_error() {
        let err = dash_err(DashError::Refresh("2025-07".to_string()));
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    }
}
