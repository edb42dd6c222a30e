//! Arbitrary async work as an effect.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use super::Effect;

/// A deferred async task. Nothing runs until the effect is executed.
pub struct Task(Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<Value>> + Send>);

impl Task {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Task(Box::new(move || f().boxed()))
    }

    pub(crate) fn start(self) -> BoxFuture<'static, anyhow::Result<Value>> {
        (self.0)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Task(..)")
    }
}

#[derive(Debug)]
pub enum AsyncOp {
    Execute { task: Task },
    Unknown { operation: String, payload: Value },
}

impl AsyncOp {
    pub fn operation(&self) -> &str {
        match self {
            AsyncOp::Execute { .. } => "execute",
            AsyncOp::Unknown { operation, .. } => operation,
        }
    }

    /// Tasks are closures and have no wire form, so every decoded record is
    /// unknown.
    pub(crate) fn decode(operation: &str, payload: Value) -> Self {
        AsyncOp::Unknown {
            operation: operation.to_string(),
            payload,
        }
    }
}

pub fn execute<F, Fut>(f: F) -> Effect
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Effect::new(AsyncOp::Execute { task: Task::new(f) })
}
