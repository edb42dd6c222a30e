use crate::effect::task::AsyncOp;
use crate::effect::{Category, Completion, EffectValue};
use crate::error::EffectError;

pub(crate) fn execute(op: AsyncOp) -> Completion {
    match op {
        AsyncOp::Execute { task } => Completion::pending("execute", async move {
            task.start()
                .await
                .map(EffectValue::Json)
                .map_err(|e| EffectError::Task(format!("{e:#}")))
        }),
        AsyncOp::Unknown { operation, .. } => {
            Completion::Ready(Err(super::unknown(Category::Async, operation)))
        }
    }
}
