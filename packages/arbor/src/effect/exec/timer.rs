use std::time::Duration;

use tracing::debug;

use crate::effect::timer::{TimerOp, Timers};
use crate::effect::{Category, Completion, EffectValue};

pub(crate) fn execute(timers: &Timers, op: TimerOp) -> Completion {
    match op {
        TimerOp::SetTimeout { delay_ms, callback } => timers
            .schedule_once(Duration::from_millis(delay_ms), callback)
            .map(EffectValue::Timer)
            .into(),
        TimerOp::SetInterval {
            interval_ms,
            callback,
        } => timers
            .schedule_repeating(Duration::from_millis(interval_ms), callback)
            .map(EffectValue::Timer)
            .into(),
        TimerOp::ClearTimeout { timeout_id: id } | TimerOp::ClearInterval { interval_id: id } => {
            if !timers.cancel(id) {
                debug!(timer = %id, "timer already finished or never existed");
            }
            Completion::Ready(Ok(EffectValue::Timer(id)))
        }
        TimerOp::Delay { delay } => {
            if let Err(e) = Timers::runtime() {
                return Completion::Ready(Err(e));
            }
            Completion::pending("delay", async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(EffectValue::Integer(i64::try_from(delay).unwrap_or(i64::MAX)))
            })
        }
        TimerOp::Unknown { operation, .. } => {
            Completion::Ready(Err(super::unknown(Category::Timer, operation)))
        }
    }
}
