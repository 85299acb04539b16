//! Domain DTOs for the todo API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently.
//! `created_at` stays the raw server string: the client only ever reads it
//! for display, so a timestamp it cannot parse is shown as-is instead of
//! failing the whole list.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Label shown for completed items.
pub const COMPLETED_LABEL: &str = "完了";
/// Label shown for items that are still open.
pub const OPEN_LABEL: &str = "未完了";

/// A single todo item returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub created_at: String,
}

impl Todo {
    pub fn status_label(&self) -> &'static str {
        if self.completed {
            COMPLETED_LABEL
        } else {
            OPEN_LABEL
        }
    }

    /// `"{title} ({label})"`, the headline of a rendered row.
    pub fn summary(&self) -> String {
        format!("{} ({})", self.title, self.status_label())
    }
}

/// Request payload for creating a new todo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTodo {
    pub title: String,
}

/// Request payload for replacing an existing todo's title and flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateTodo {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// Request payload for creating several todos at once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCreate {
    pub titles: Vec<String>,
}

/// Per-title outcome of a batch creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCreateResult {
    pub title: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl BatchCreateResult {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Envelope of the batch endpoint's response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCreateResponse {
    pub results: Vec<BatchCreateResult>,
}

/// Acknowledgement body returned by update and delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub message: String,
}

/// Parse a server timestamp. RFC 3339 first, then a bare
/// `YYYY-MM-DDTHH:MM:SS[.f]` read as UTC.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Format `created_at` in `tz` as `YYYY/M/D H:MM:SS`. Unparseable input is
/// returned verbatim.
pub fn format_created_at<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match parse_created_at(raw) {
        Some(utc) => utc
            .with_timezone(tz)
            .format("%Y/%-m/%-d %-H:%M:%S")
            .to_string(),
        None => raw.to_string(),
    }
}
