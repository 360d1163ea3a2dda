use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::calendar::aggregate::{CalendarSource, Feed, default_palette};
use crate::error::DashError;

pub const CONFIG_PATH_VAR: &str = "DASHCAL_CONFIG";
const DEFAULT_REFRESH_SECS: u64 = 60;

/// One configured feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CalendarConfig {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Layout of the TOML file named by `DASHCAL_CONFIG`.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    refresh_secs: Option<u64>,
    #[serde(default)]
    calendars: Vec<CalendarConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub calendars: Vec<CalendarConfig>,
    pub timezone: Tz,
    pub refresh_interval: Duration,
}

impl Config {
    /// Read the TOML file named by `DASHCAL_CONFIG` if set, otherwise the
    /// `DASHCAL_*` environment variables.
    pub fn load() -> Result<Self, DashError> {
        match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim())),
            _ => Self::from_lookup(|key| std::env::var(key).ok()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, DashError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DashError::Config(format!("Failed to read config file at {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, DashError> {
        let file: FileConfig = toml::from_str(contents)
            .map_err(|e| DashError::Config(format!("Failed to parse config file: {e}")))?;

        Ok(Self {
            calendars: file.calendars,
            timezone: parse_timezone(file.timezone.as_deref())?,
            refresh_interval: refresh_interval(file.refresh_secs)?,
        })
    }

    /// Build from environment-style variables: a comma-separated
    /// `DASHCAL_CALENDAR_URLS` plus 1-based `DASHCAL_CALENDAR_NAME_{n}` and
    /// `DASHCAL_CALENDAR_COLOR_{n}`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DashError> {
        let urls = lookup("DASHCAL_CALENDAR_URLS").unwrap_or_default();
        let calendars = urls
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .enumerate()
            .map(|(i, url)| CalendarConfig {
                url: url.to_string(),
                name: lookup(&format!("DASHCAL_CALENDAR_NAME_{}", i + 1)),
                color: lookup(&format!("DASHCAL_CALENDAR_COLOR_{}", i + 1)),
            })
            .collect();

        let refresh_secs = match lookup("DASHCAL_REFRESH_SECS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                DashError::Config(format!("DASHCAL_REFRESH_SECS is not a number: {raw}"))
            })?),
            None => None,
        };

        Ok(Self {
            calendars,
            timezone: parse_timezone(lookup("DASHCAL_TIMEZONE").as_deref())?,
            refresh_interval: refresh_interval(refresh_secs)?,
        })
    }

    /// Configured colours with blanks skipped, or the default palette when
    /// none are set. Sources pick `palette[index % len]`.
    pub fn palette(&self) -> Vec<String> {
        let colors: Vec<String> = self
            .calendars
            .iter()
            .filter_map(|c| c.color.as_deref().and_then(clean_value))
            .collect();
        if colors.is_empty() {
            default_palette()
        } else {
            colors
        }
    }

    pub fn sources(&self) -> Vec<CalendarSource> {
        self.calendars
            .iter()
            .enumerate()
            .map(|(i, c)| CalendarSource {
                name: c
                    .name
                    .as_deref()
                    .and_then(clean_value)
                    .unwrap_or_else(|| format!("Calendar {}", i + 1)),
                color: None,
                feed: Feed::Url(c.url.clone()),
            })
            .collect()
    }
}

/// Trim and strip one pair of surrounding quotes; `None` if nothing is left.
fn clean_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let unquoted = trimmed.strip_prefix(['"', '\'']).unwrap_or(trimmed);
    let unquoted = unquoted.strip_suffix(['"', '\'']).unwrap_or(unquoted);
    Some(unquoted.to_string())
}

fn parse_timezone(name: Option<&str>) -> Result<Tz, DashError> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|e| DashError::Config(format!("Unknown timezone {name}: {e}"))),
        None => Ok(Tz::UTC),
    }
}

fn refresh_interval(secs: Option<u64>) -> Result<Duration, DashError> {
    match secs.unwrap_or(DEFAULT_REFRESH_SECS) {
        0 => Err(DashError::Config("refresh interval must be positive".to_string())),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn env_without_calendars_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.calendars.is_empty());
        assert_eq!(config.timezone, Tz::UTC);
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.palette(), default_palette());
    }

    #[test]
    fn env_calendars_get_names_and_default_names() {
        let config = Config::from_lookup(lookup(&[
            ("DASHCAL_CALENDAR_URLS", "https://a.example/a.ics, https://b.example/b.ics"),
            ("DASHCAL_CALENDAR_NAME_1", "\"Work\""),
            ("DASHCAL_TIMEZONE", "Europe/Paris"),
            ("DASHCAL_REFRESH_SECS", "300"),
        ]))
        .unwrap();

        let sources = config.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "Work");
        assert_eq!(sources[0].feed, Feed::Url("https://a.example/a.ics".to_string()));
        assert_eq!(sources[1].name, "Calendar 2");
        assert_eq!(config.timezone, chrono_tz::Europe::Paris);
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
    }

    #[test]
    fn palette_keeps_only_configured_colours_in_order() {
        let config = Config::from_lookup(lookup(&[
            ("DASHCAL_CALENDAR_URLS", "u1,u2,u3"),
            ("DASHCAL_CALENDAR_COLOR_1", "  "),
            ("DASHCAL_CALENDAR_COLOR_2", "'#112233'"),
            ("DASHCAL_CALENDAR_COLOR_3", "#445566"),
        ]))
        .unwrap();
        assert_eq!(config.palette(), vec!["#112233", "#445566"]);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let tz = Config::from_lookup(lookup(&[("DASHCAL_TIMEZONE", "Mars/Olympus")]));
        assert!(matches!(tz, Err(DashError::Config(_))));

        let secs = Config::from_lookup(lookup(&[("DASHCAL_REFRESH_SECS", "soon")]));
        assert!(matches!(secs, Err(DashError::Config(_))));

        let zero = Config::from_lookup(lookup(&[("DASHCAL_REFRESH_SECS", "0")]));
        assert!(matches!(zero, Err(DashError::Config(_))));
    }

    #[test]
    fn toml_file_layout() {
        let config = Config::from_toml(
            r##"
timezone = "America/New_York"
refresh_secs = 120

[[calendars]]
url = "webcal://example.com/family.ics"
name = "Family"
color = "#FF0000"

[[calendars]]
url = "https://example.com/work.ics"
"##,
        )
        .unwrap();

        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.refresh_interval, Duration::from_secs(120));
        assert_eq!(config.palette(), vec!["#FF0000"]);
        let names: Vec<_> = config.sources().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Family", "Calendar 2"]);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(matches!(
            Config::from_toml("calendars = 3"),
            Err(DashError::Config(_))
        ));
    }
}
