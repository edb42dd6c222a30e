//! Sum-type vocabulary shared by the reconciler and the executors.
//!
//! Three families are used everywhere instead of unwinding across module boundaries:
//!
//! - **Optional**: [`Option<T>`] (`Some` = present, `None` = absent)
//! - **Disjoint-Result**: [`Result<T, E>`] where `Err` is the "left" failure value
//! - **Try-Result**: [`Attempt<T>`], produced by wrapping a call that might panic
//!
//! All three chain with `map` / `and_then`: on the good state the held value is
//! transformed, on the bad state the failure is propagated untouched.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;

/// A panic caught at a boundary, reduced to its message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Caught {
    /// The panic payload rendered as text.
    pub message: String,
}

/// Result of a call made under [`attempt`].
pub type Attempt<T> = Result<T, Caught>;

/// Run `f`, converting a panic into [`Caught`] instead of unwinding further.
///
/// `AssertUnwindSafe` is used because callers never observe state touched by
/// `f` after a panic; they only see the `Caught` value.
pub fn attempt<T>(f: impl FnOnce() -> T) -> Attempt<T> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| Caught {
        message: panic_message(payload.as_ref()),
    })
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
