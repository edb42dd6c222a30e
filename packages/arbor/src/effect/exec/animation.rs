use crate::effect::animation::{AnimationOp, FrameQueue};
use crate::effect::{Category, EffectResult, EffectValue};

pub(crate) fn execute(frames: &mut FrameQueue, op: AnimationOp) -> EffectResult {
    match op {
        AnimationOp::RequestAnimationFrame { callback } => {
            Ok(EffectValue::Frame(frames.request(callback)))
        }
        AnimationOp::CancelAnimationFrame { id } => {
            frames.cancel(id);
            Ok(EffectValue::Frame(id))
        }
        AnimationOp::Unknown { operation, .. } => {
            Err(super::unknown(Category::Animation, operation))
        }
    }
}
