//! One executor per effect category.
//!
//! Each executor matches on its closed operation enum and reports an
//! `Unknown` record as [`EffectError::UnknownOperation`].

pub(crate) mod animation;
pub(crate) mod browser;
pub(crate) mod datetime;
pub(crate) mod dom;
pub(crate) mod http;
pub(crate) mod log;
pub(crate) mod random;
pub(crate) mod storage;
pub(crate) mod task;
pub(crate) mod timer;

use crate::effect::Category;
use crate::error::EffectError;

pub(crate) fn unknown(category: Category, operation: String) -> EffectError {
    tracing::warn!(category = %category, operation = %operation, "unknown effect operation");
    EffectError::UnknownOperation {
        category,
        operation,
    }
}
