use chrono::Utc;

use crate::effect::log::{emit, redact, LogEntry, LogLevel, LogOp};
use crate::effect::{Category, EffectResult, EffectValue};

pub(crate) fn execute(op: LogOp) -> EffectResult {
    let entry = match op {
        LogOp::Log {
            level,
            message,
            context,
        } => LogEntry {
            timestamp: Utc::now(),
            level,
            message,
            context: redact(context),
            error: None,
        },
        LogOp::Error { error, context } => LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Error,
            message: error.clone(),
            context: redact(context),
            error: Some(error),
        },
        LogOp::Unknown { operation, .. } => return Err(super::unknown(Category::Log, operation)),
    };
    emit(&entry);
    Ok(EffectValue::Log(entry))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;
    use crate::effect::log::REDACTED;

    #[test]
    fn test_log_returns_redacted_entry() {
        let mut context = Map::new();
        context.insert("token".into(), json!("abc"));
        context.insert("page".into(), json!(2));

        let EffectValue::Log(entry) = execute(LogOp::Log {
            level: LogLevel::Warn,
            message: "slow page".into(),
            context,
        })
        .unwrap() else {
            panic!("Expected log entry");
        };

        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.context["token"], REDACTED);
        assert_eq!(entry.context["page"], 2);
        assert_eq!(entry.error, None);
    }

    #[test]
    fn test_error_entry_carries_error() {
        let EffectValue::Log(entry) = execute(LogOp::Error {
            error: "disk full".into(),
            context: Map::new(),
        })
        .unwrap() else {
            panic!("Expected log entry");
        };
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.error.as_deref(), Some("disk full"));
    }
}
