use chrono::Utc;

use crate::effect::datetime::{format, DateTimeOp, DEFAULT_FORMAT};
use crate::effect::{Category, EffectResult, EffectValue};

pub(crate) fn execute(op: DateTimeOp) -> EffectResult {
    match op {
        DateTimeOp::GetCurrentTime => Ok(EffectValue::Integer(Utc::now().timestamp_millis())),
        DateTimeOp::GetDate => Ok(EffectValue::Timestamp(Utc::now())),
        DateTimeOp::FormatDate { date, format: pattern } => {
            let date = date.resolve()?;
            format(date, pattern.as_deref().unwrap_or(DEFAULT_FORMAT)).map(EffectValue::Text)
        }
        DateTimeOp::Unknown { operation, .. } => Err(super::unknown(Category::DateTime, operation)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::datetime::DateInput;
    use crate::error::EffectError;

    #[test]
    fn test_format_date_default_pattern() {
        let value = execute(DateTimeOp::FormatDate {
            date: DateInput::Millis(1_700_000_000_000),
            format: None,
        })
        .unwrap();
        assert_eq!(value, EffectValue::Text("2023-11-14 22:13:20".into()));
    }

    #[test]
    fn test_format_date_bad_input() {
        let err = execute(DateTimeOp::FormatDate {
            date: DateInput::Text("soon".into()),
            format: Some("%Y".into()),
        })
        .unwrap_err();
        assert!(matches!(err, EffectError::InvalidInput { operation: "formatDate", .. }));
    }

    #[test]
    fn test_current_time_is_millis() {
        let EffectValue::Integer(ms) = execute(DateTimeOp::GetCurrentTime).unwrap() else {
            panic!("Expected integer");
        };
        assert!(ms > 1_600_000_000_000);
    }
}
