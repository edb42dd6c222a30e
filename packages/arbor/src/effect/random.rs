//! Randomness effects.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{Effect, UnknownFallback};
use crate::error::EffectError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RandomOp {
    /// Uniform float in `[min, max)`.
    Number { min: f64, max: f64 },
    /// Uniform integer in `[min, max]`.
    Integer { min: i64, max: i64 },
    Uuid,
    #[serde(skip)]
    Unknown { operation: String, payload: Value },
}

impl RandomOp {
    pub fn operation(&self) -> &str {
        match self {
            RandomOp::Number { .. } => "number",
            RandomOp::Integer { .. } => "integer",
            RandomOp::Uuid => "uuid",
            RandomOp::Unknown { operation, .. } => operation,
        }
    }
}

impl UnknownFallback for RandomOp {
    fn unknown(operation: String, payload: Value) -> Self {
        RandomOp::Unknown { operation, payload }
    }
}

pub fn number(min: f64, max: f64) -> Effect {
    Effect::new(RandomOp::Number { min, max })
}

pub fn integer(min: i64, max: i64) -> Effect {
    Effect::new(RandomOp::Integer { min, max })
}

pub fn uuid() -> Effect {
    Effect::new(RandomOp::Uuid)
}

/// Shared random generator. Seed it for reproducible runs.
#[derive(Clone)]
pub struct RandomSource {
    rng: Arc<Mutex<fastrand::Rng>>,
}

impl RandomSource {
    pub fn new() -> Self {
        Self::from_rng(fastrand::Rng::new())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(fastrand::Rng::with_seed(seed))
    }

    fn from_rng(rng: fastrand::Rng) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut fastrand::Rng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    pub fn number(&self, min: f64, max: f64) -> Result<f64, EffectError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(EffectError::invalid("number", "bounds must be finite"));
        }
        if min > max {
            return Err(EffectError::invalid(
                "number",
                format!("min {min} is greater than max {max}"),
            ));
        }
        Ok(self.with_rng(|rng| min + rng.f64() * (max - min)))
    }

    pub fn integer(&self, min: i64, max: i64) -> Result<i64, EffectError> {
        if min > max {
            return Err(EffectError::invalid(
                "integer",
                format!("min {min} is greater than max {max}"),
            ));
        }
        Ok(self.with_rng(|rng| rng.i64(min..=max)))
    }

    /// A version 4 UUID drawn from this source.
    pub fn uuid(&self) -> Uuid {
        let bytes = self.with_rng(|rng| {
            let mut bytes = [0u8; 16];
            rng.fill(&mut bytes);
            bytes
        });
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomSource").finish_non_exhaustive()
    }
}
