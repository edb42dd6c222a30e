//! Clock and date formatting effects.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{Effect, UnknownFallback};
use crate::error::EffectError;

pub const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A date given either as Unix milliseconds or as an RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Millis(i64),
    Text(String),
}

impl DateInput {
    pub fn resolve(&self) -> Result<DateTime<Utc>, EffectError> {
        match self {
            DateInput::Millis(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .ok_or_else(|| {
                    EffectError::invalid("formatDate", format!("timestamp {ms} is out of range"))
                }),
            DateInput::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| {
                    EffectError::invalid("formatDate", format!("cannot parse date {s:?}: {e}"))
                }),
        }
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(date: DateTime<Utc>) -> Self {
        DateInput::Millis(date.timestamp_millis())
    }
}

impl From<i64> for DateInput {
    fn from(ms: i64) -> Self {
        DateInput::Millis(ms)
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DateTimeOp {
    GetCurrentTime,
    GetDate,
    FormatDate {
        date: DateInput,
        #[serde(default)]
        format: Option<String>,
    },
    #[serde(skip)]
    Unknown { operation: String, payload: Value },
}

impl DateTimeOp {
    pub fn operation(&self) -> &str {
        match self {
            DateTimeOp::GetCurrentTime => "getCurrentTime",
            DateTimeOp::GetDate => "getDate",
            DateTimeOp::FormatDate { .. } => "formatDate",
            DateTimeOp::Unknown { operation, .. } => operation,
        }
    }
}

impl UnknownFallback for DateTimeOp {
    fn unknown(operation: String, payload: Value) -> Self {
        DateTimeOp::Unknown { operation, payload }
    }
}

pub fn get_current_time() -> Effect {
    Effect::new(DateTimeOp::GetCurrentTime)
}

pub fn get_date() -> Effect {
    Effect::new(DateTimeOp::GetDate)
}

pub fn format_date(date: impl Into<DateInput>, format: Option<&str>) -> Effect {
    Effect::new(DateTimeOp::FormatDate {
        date: date.into(),
        format: format.map(str::to_string),
    })
}

/// Format `date` with a strftime pattern, rejecting malformed patterns
/// instead of letting the formatter fail mid-write.
pub fn format(date: DateTime<Utc>, pattern: &str) -> Result<String, EffectError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(EffectError::invalid(
            "formatDate",
            format!("invalid format pattern {pattern:?}"),
        ));
    }
    Ok(date.format_with_items(items.into_iter()).to_string())
}
