//! Content-line handling: unfolding and classification of the handful of
//! properties the event parser cares about.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static FOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]").expect("fold pattern is valid"));

/// Remove RFC 5545 line folding (a line break followed by one space or tab).
pub fn unfold(text: &str) -> Cow<'_, str> {
    FOLD_RE.replace_all(text, "")
}

/// Unfold, split on CRLF/LF and trim each logical line.
pub fn logical_lines(text: &str) -> Vec<String> {
    unfold(text)
        .lines()
        .map(|line| line.trim().to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Summary,
    DtStart,
    DtEnd,
    RRule,
    Duration,
    Location,
    Uid,
    Status,
}

impl PropertyKind {
    /// Properties taken verbatim after a plain `NAME:` prefix.
    const SIMPLE: [(&'static str, PropertyKind); 6] = [
        ("SUMMARY:", PropertyKind::Summary),
        ("RRULE:", PropertyKind::RRule),
        ("DURATION:", PropertyKind::Duration),
        ("LOCATION:", PropertyKind::Location),
        ("UID:", PropertyKind::Uid),
        ("STATUS:", PropertyKind::Status),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcsLine<'a> {
    BeginEvent,
    EndEvent,
    Property {
        kind: PropertyKind,
        /// Raw parameter section, e.g. `;VALUE=DATE`. Empty for simple properties.
        params: &'a str,
        value: &'a str,
    },
    Other,
}

impl<'a> IcsLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        match line {
            "BEGIN:VEVENT" => return IcsLine::BeginEvent,
            "END:VEVENT" => return IcsLine::EndEvent,
            _ => {}
        }

        for (name, kind) in [("DTSTART", PropertyKind::DtStart), ("DTEND", PropertyKind::DtEnd)] {
            if let Some(rest) = line.strip_prefix(name) {
                // Parameters may carry anything; the value follows the last colon.
                return match rest.rsplit_once(':') {
                    Some((params, value)) => IcsLine::Property { kind, params, value },
                    None => IcsLine::Other,
                };
            }
        }

        for (prefix, kind) in PropertyKind::SIMPLE {
            if let Some(value) = line.strip_prefix(prefix) {
                return IcsLine::Property {
                    kind,
                    params: "",
                    value,
                };
            }
        }

        IcsLine::Other
    }
}

/// True when a parameter section contains `VALUE=DATE` (and not `VALUE=DATE-TIME`).
pub fn has_date_value_param(params: &str) -> bool {
    params
        .split(';')
        .any(|param| param.trim().eq_ignore_ascii_case("VALUE=DATE"))
}
