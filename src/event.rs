//! Calendar event model and validation of directly entered events.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex is valid"));
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}:\d{2}$").expect("time regex is valid"));

/// A single calendar entry as persisted in the event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Store-wide unique id. `None` until the event is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: NaiveDate,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Display tag, only set on manually created or edited events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Event {
    pub fn new(date: NaiveDate, title: impl Into<String>) -> Self {
        Self { id: None, date, title: title.into(), note: None, color: None }
    }

    /// The `YYYY-MM` month this event falls in.
    pub fn month_key(&self) -> String {
        month_key(self.date)
    }

    /// Same calendar content, ignoring id and color.
    pub fn same_entry(&self, other: &Event) -> bool {
        self.date == other.date && self.title == other.title && self.note == other.note
    }
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Validation failures for directly entered events.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Event title must not be empty")]
    EmptyTitle,
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),
}

/// Input for creating or editing a single event by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl EventRequest {
    /// Validate the request and build the event, with the time range folded into the title.
    pub fn to_event(&self) -> Result<Event, EventError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(EventError::EmptyTitle);
        }
        let date = parse_date(&self.date)?;
        let start = normalize_time(&self.start_time)?;
        let end = normalize_time(&self.end_time)?;

        Ok(Event {
            id: None,
            date,
            title: format!("{} {}-{}", title, start, end),
            note: non_empty(self.note.as_deref()),
            color: non_empty(self.color.as_deref()),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(date: &str) -> Result<NaiveDate, EventError> {
    let date = date.trim();
    if !DATE_RE.is_match(date) {
        return Err(EventError::InvalidDate(date.to_string()));
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| EventError::InvalidDate(date.to_string()))
}

/// Validate an `H:MM`/`HH:MM` time and return it zero-padded.
pub fn normalize_time(time: &str) -> Result<String, EventError> {
    let time = time.trim();
    let invalid = || EventError::InvalidTime(time.to_string());
    if !TIME_RE.is_match(time) {
        return Err(invalid());
    }
    let (hours, minutes) = time.split_once(':').ok_or_else(invalid)?;
    match (hours.parse::<u32>(), minutes.parse::<u32>()) {
        (Ok(h), Ok(m)) if h < 24 && m < 60 => Ok(format!("{:02}:{:02}", h, m)),
        _ => Err(invalid()),
    }
}

/// Validate a `YYYY-MM` month key and return it normalized.
pub fn parse_month_key(month: &str) -> Result<String, EventError> {
    let month = month.trim();
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
        .map(month_key)
        .map_err(|_| EventError::InvalidMonth(month.to_string()))
}
