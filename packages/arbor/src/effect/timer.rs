//! Timer effects and the tokio-backed timer registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::{Effect, UnknownFallback};
use crate::error::EffectError;
use crate::outcome::attempt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(u64);

impl TimerId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Runs once when a timeout fires.
pub struct TimeoutCallback(Box<dyn FnOnce() + Send>);

/// Runs on every interval tick.
pub struct IntervalCallback(Box<dyn FnMut() + Send>);

impl fmt::Debug for TimeoutCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TimeoutCallback(..)")
    }
}

impl fmt::Debug for IntervalCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IntervalCallback(..)")
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TimerOp {
    #[serde(skip)]
    SetTimeout {
        delay_ms: u64,
        callback: TimeoutCallback,
    },
    #[serde(skip)]
    SetInterval {
        interval_ms: u64,
        callback: IntervalCallback,
    },
    ClearTimeout {
        timeout_id: TimerId,
    },
    ClearInterval {
        interval_id: TimerId,
    },
    /// Resolves with the delay after `delay` milliseconds.
    Delay {
        delay: u64,
    },
    #[serde(skip)]
    Unknown {
        operation: String,
        payload: Value,
    },
}

impl TimerOp {
    pub fn operation(&self) -> &str {
        match self {
            TimerOp::SetTimeout { .. } => "setTimeout",
            TimerOp::SetInterval { .. } => "setInterval",
            TimerOp::ClearTimeout { .. } => "clearTimeout",
            TimerOp::ClearInterval { .. } => "clearInterval",
            TimerOp::Delay { .. } => "delay",
            TimerOp::Unknown { operation, .. } => operation,
        }
    }
}

impl UnknownFallback for TimerOp {
    fn unknown(operation: String, payload: Value) -> Self {
        TimerOp::Unknown { operation, payload }
    }
}

pub fn set_timeout(delay_ms: u64, callback: impl FnOnce() + Send + 'static) -> Effect {
    Effect::new(TimerOp::SetTimeout {
        delay_ms,
        callback: TimeoutCallback(Box::new(callback)),
    })
}

pub fn set_interval(interval_ms: u64, callback: impl FnMut() + Send + 'static) -> Effect {
    Effect::new(TimerOp::SetInterval {
        interval_ms,
        callback: IntervalCallback(Box::new(callback)),
    })
}

pub fn clear_timeout(timeout_id: TimerId) -> Effect {
    Effect::new(TimerOp::ClearTimeout { timeout_id })
}

pub fn clear_interval(interval_id: TimerId) -> Effect {
    Effect::new(TimerOp::ClearInterval { interval_id })
}

pub fn delay(delay_ms: u64) -> Effect {
    Effect::new(TimerOp::Delay { delay: delay_ms })
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
struct TimerTable {
    next: u64,
    live: HashMap<TimerId, AbortHandle>,
}

/// Live timeouts and intervals, each a spawned tokio task.
///
/// Clones share the same table.
#[derive(Clone, Default)]
pub struct Timers {
    table: Arc<Mutex<TimerTable>>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TimerTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn runtime() -> Result<Handle, EffectError> {
        Handle::try_current()
            .map_err(|_| EffectError::Unsupported("Timers require a running tokio runtime".into()))
    }

    /// Run `callback` once after `delay`.
    pub fn schedule_once(
        &self,
        delay: Duration,
        callback: TimeoutCallback,
    ) -> Result<TimerId, EffectError> {
        let handle = Self::runtime()?;
        let mut table = self.lock();
        let id = TimerId(table.next);
        table.next += 1;

        let timers = self.clone();
        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            timers.lock().live.remove(&id);
            if let Err(caught) = attempt(callback.0) {
                warn!(timer = %id, error = %caught, "timeout callback panicked");
            }
        });
        table.live.insert(id, task.abort_handle());

        debug!(timer = %id, delay_ms = delay.as_millis() as u64, "timeout scheduled");
        Ok(id)
    }

    /// Run `callback` every `period`, first tick one period from now.
    pub fn schedule_repeating(
        &self,
        period: Duration,
        callback: IntervalCallback,
    ) -> Result<TimerId, EffectError> {
        if period.is_zero() {
            return Err(EffectError::invalid("setInterval", "interval must be greater than zero"));
        }
        let handle = Self::runtime()?;
        let mut table = self.lock();
        let id = TimerId(table.next);
        table.next += 1;

        let mut callback = callback.0;
        let task = handle.spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if let Err(caught) = attempt(&mut callback) {
                    warn!(timer = %id, error = %caught, "interval callback panicked");
                }
            }
        });
        table.live.insert(id, task.abort_handle());

        debug!(timer = %id, interval_ms = period.as_millis() as u64, "interval scheduled");
        Ok(id)
    }

    /// Cancel a timer. Returns whether it was still live.
    pub fn cancel(&self, id: TimerId) -> bool {
        match self.lock().live.remove(&id) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, task) in self.lock().live.drain() {
            task.abort();
        }
    }

    pub fn active(&self) -> usize {
        self.lock().live.len()
    }
}

impl fmt::Debug for Timers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timers").field("active", &self.active()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::effect::{Category, EffectOp};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let read = {
            let count = count.clone();
            move || count.load(Ordering::SeqCst)
        };
        (count, read)
    }

    #[test]
    fn test_clear_ops_decode() {
        let effect = Effect::from_parts(Category::Timer, "clearTimeout", json!({ "timeoutId": 3 }));
        assert!(matches!(
            effect.op(),
            EffectOp::Timer(TimerOp::ClearTimeout { timeout_id }) if timeout_id.raw() == 3
        ));
        let effect = Effect::from_parts(Category::Timer, "delay", json!({ "delay": 20 }));
        assert!(matches!(effect.op(), EffectOp::Timer(TimerOp::Delay { delay: 20 })));
    }

    #[test]
    fn test_scheduling_without_runtime_is_unsupported() {
        let timers = Timers::new();
        let err = timers
            .schedule_once(Duration::from_millis(1), TimeoutCallback(Box::new(|| {})))
            .unwrap_err();
        assert!(matches!(err, EffectError::Unsupported(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_once_and_unregisters() {
        let timers = Timers::new();
        let (count, read) = counter();
        timers
            .schedule_once(
                Duration::from_millis(50),
                TimeoutCallback(Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();
        assert_eq!(timers.active(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(read(), 1);
        assert_eq!(timers.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timeout_never_fires() {
        let timers = Timers::new();
        let (count, read) = counter();
        let id = timers
            .schedule_once(
                Duration::from_millis(50),
                TimeoutCallback(Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(read(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks_until_cancelled() {
        let timers = Timers::new();
        let (count, read) = counter();
        let id = timers
            .schedule_repeating(
                Duration::from_millis(10),
                IntervalCallback(Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(35)).await;
        assert_eq!(read(), 3);

        timers.cancel(id);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(read(), 3);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let timers = Timers::new();
        let err = timers
            .schedule_repeating(Duration::ZERO, IntervalCallback(Box::new(|| {})))
            .unwrap_err();
        assert!(matches!(err, EffectError::InvalidInput { operation: "setInterval", .. }));
    }
}
