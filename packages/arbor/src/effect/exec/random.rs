use crate::effect::random::{RandomOp, RandomSource};
use crate::effect::{Category, EffectResult, EffectValue};

pub(crate) fn execute(source: &RandomSource, op: RandomOp) -> EffectResult {
    match op {
        RandomOp::Number { min, max } => source.number(min, max).map(EffectValue::Number),
        RandomOp::Integer { min, max } => source.integer(min, max).map(EffectValue::Integer),
        RandomOp::Uuid => Ok(EffectValue::Text(source.uuid().to_string())),
        RandomOp::Unknown { operation, .. } => Err(super::unknown(Category::Random, operation)),
    }
}
