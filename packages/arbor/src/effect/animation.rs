//! Animation frame effects.
//!
//! There is no display refresh to hook into, so frames are driven
//! explicitly: requested callbacks wait in a [`FrameQueue`] until the driver
//! calls [`FrameQueue::run`] (usually through
//! [`Environment::run_animation_frame`](crate::effect::Environment::run_animation_frame)).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{Effect, UnknownFallback};
use crate::outcome::attempt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(u64);

impl FrameId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame-{}", self.0)
    }
}

/// Receives the frame timestamp in milliseconds.
pub struct FrameCallback(Box<dyn FnOnce(f64) + Send>);

impl fmt::Debug for FrameCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FrameCallback(..)")
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AnimationOp {
    #[serde(skip)]
    RequestAnimationFrame { callback: FrameCallback },
    CancelAnimationFrame { id: FrameId },
    #[serde(skip)]
    Unknown { operation: String, payload: Value },
}

impl AnimationOp {
    pub fn operation(&self) -> &str {
        match self {
            AnimationOp::RequestAnimationFrame { .. } => "requestAnimationFrame",
            AnimationOp::CancelAnimationFrame { .. } => "cancelAnimationFrame",
            AnimationOp::Unknown { operation, .. } => operation,
        }
    }
}

impl UnknownFallback for AnimationOp {
    fn unknown(operation: String, payload: Value) -> Self {
        AnimationOp::Unknown { operation, payload }
    }
}

pub fn request_animation_frame(callback: impl FnOnce(f64) + Send + 'static) -> Effect {
    Effect::new(AnimationOp::RequestAnimationFrame {
        callback: FrameCallback(Box::new(callback)),
    })
}

pub fn cancel_animation_frame(id: FrameId) -> Effect {
    Effect::new(AnimationOp::CancelAnimationFrame { id })
}

#[derive(Default)]
pub struct FrameQueue {
    next: u64,
    pending: Vec<(FrameId, FrameCallback)>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, callback: FrameCallback) -> FrameId {
        self.next += 1;
        let id = FrameId(self.next);
        self.pending.push((id, callback));
        id
    }

    /// Returns whether the frame was still pending.
    pub fn cancel(&mut self, id: FrameId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(pending, _)| *pending != id);
        self.pending.len() != before
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run every pending callback in request order. Returns how many ran.
    pub fn run(&mut self, timestamp_ms: f64) -> usize {
        let due = std::mem::take(&mut self.pending);
        let count = due.len();
        for (id, callback) in due {
            if let Err(caught) = attempt(|| (callback.0)(timestamp_ms)) {
                warn!(frame = %id, error = %caught, "animation frame callback panicked");
            }
        }
        count
    }
}

impl fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameQueue")
            .field("pending", &self.pending.len())
            .finish()
    }
}
