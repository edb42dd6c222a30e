//! Logging effects, emitted through `tracing`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::{Effect, UnknownFallback};

const LOG_TARGET: &str = "arbor::effect::log";

/// Substrings that mark a context key as sensitive.
const SENSITIVE_KEYS: [&str; 5] = ["password", "token", "secret", "key", "auth"];

pub const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LogOp {
    Log {
        #[serde(default)]
        level: LogLevel,
        message: String,
        #[serde(default)]
        context: Map<String, Value>,
    },
    Error {
        error: String,
        #[serde(default)]
        context: Map<String, Value>,
    },
    #[serde(skip)]
    Unknown { operation: String, payload: Value },
}

impl LogOp {
    pub fn operation(&self) -> &str {
        match self {
            LogOp::Log { .. } => "log",
            LogOp::Error { .. } => "error",
            LogOp::Unknown { operation, .. } => operation,
        }
    }
}

impl UnknownFallback for LogOp {
    fn unknown(operation: String, payload: Value) -> Self {
        LogOp::Unknown { operation, payload }
    }
}

pub fn log(level: LogLevel, message: impl Into<String>, context: Map<String, Value>) -> Effect {
    Effect::new(LogOp::Log {
        level,
        message: message.into(),
        context,
    })
}

pub fn info(message: impl Into<String>) -> Effect {
    log(LogLevel::Info, message, Map::new())
}

pub fn warn(message: impl Into<String>) -> Effect {
    log(LogLevel::Warn, message, Map::new())
}

pub fn error(err: impl fmt::Display, context: Map<String, Value>) -> Effect {
    Effect::new(LogOp::Error {
        error: err.to_string(),
        context,
    })
}

/// What a log effect recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub context: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|s| key.contains(s))
}

/// Replace the values of sensitive keys, at any depth.
pub fn redact(context: Map<String, Value>) -> Map<String, Value> {
    context
        .into_iter()
        .map(|(k, v)| {
            let v = if is_sensitive(&k) {
                Value::String(REDACTED.into())
            } else {
                redact_value(v)
            };
            (k, v)
        })
        .collect()
}

fn redact_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(redact_value).collect()),
        other => other,
    }
}

/// Emit `entry` at its level.
pub(crate) fn emit(entry: &LogEntry) {
    let context = Value::Object(entry.context.clone());
    let message = &entry.message;
    match (entry.level, &entry.error) {
        (_, Some(err)) => error!(target: LOG_TARGET, error = %err, %context, "{message}"),
        (LogLevel::Error, None) => error!(target: LOG_TARGET, %context, "{message}"),
        (LogLevel::Warn, None) => warn!(target: LOG_TARGET, %context, "{message}"),
        (LogLevel::Info, None) => info!(target: LOG_TARGET, %context, "{message}"),
        (LogLevel::Debug, None) => debug!(target: LOG_TARGET, %context, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::effect::{Category, EffectOp};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    #[test]
    fn test_redact_nested_sensitive_keys() {
        let context = object(json!({
            "user": "ada",
            "password": "hunter2",
            "request": { "apiKey": "abc", "path": "/x" },
            "items": [{ "AuthHeader": "Bearer y" }]
        }));

        let redacted = Value::Object(redact(context));

        assert_eq!(redacted["user"], "ada");
        assert_eq!(redacted["password"], REDACTED);
        assert_eq!(redacted["request"]["apiKey"], REDACTED);
        assert_eq!(redacted["request"]["path"], "/x");
        assert_eq!(redacted["items"][0]["AuthHeader"], REDACTED);
    }

    #[test]
    fn test_level_defaults_to_info() {
        let effect = Effect::from_parts(Category::Log, "log", json!({ "message": "hello" }));
        assert!(matches!(
            effect.op(),
            EffectOp::Log(LogOp::Log { level: LogLevel::Info, .. })
        ));

        let payload = json!({ "message": "x", "level": "loud" });
        let effect = Effect::from_parts(Category::Log, "log", payload);
        assert!(matches!(effect.op(), EffectOp::Log(LogOp::Unknown { .. })));
    }
}
