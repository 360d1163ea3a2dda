use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Failed to fetch calendar feed {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calendar refresh superseded: {0}")]
    Refresh(String),
}
