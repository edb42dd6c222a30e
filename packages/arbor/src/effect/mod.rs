//! Effects: inert records describing a side effect, interpreted later.
//!
//! # Architecture
//!
//! ```text
//! pure code                         Environment
//! ─────────                         ───────────
//! effect::http::get("/api") ──► Effect ──► execute() ──► Completion
//!                                 │                         │
//!                                 │ id, op, timestamp       ├─ Ready(Result)
//!                                 ▼                         └─ Pending(future)
//!                     EffectOp::Http(HttpOp::Get{..})
//! ```
//!
//! Building an effect never touches the environment; only
//! [`Environment::execute`] does. Every category has a closed operation enum
//! with one variant per operation, plus an `Unknown` variant for records
//! decoded from a name this build does not recognize (see
//! [`Effect::from_parts`]).
//!
//! # Example
//!
//! ```ignore
//! let effects = vec![
//!     effect::storage::set_local("theme", "dark"),
//!     effect::http::get("/api/items"),
//! ];
//! let results = effect::compose::sequence(&mut env, effects).await;
//! ```

pub mod animation;
pub mod browser;
pub mod compose;
pub mod datetime;
pub mod dom;
mod env;
pub(crate) mod exec;
pub mod http;
pub mod log;
pub mod random;
pub mod storage;
pub mod task;
pub mod timer;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

pub use env::{Completion, EffectResult, Environment, EnvironmentBuilder};

use crate::dom::{ListenerId, NodeId};
use crate::effect::animation::{AnimationOp, FrameId};
use crate::effect::browser::{BrowserOp, GeoPosition, NotificationHandle};
use crate::effect::datetime::DateTimeOp;
use crate::effect::dom::DomOp;
use crate::effect::http::{HttpOp, HttpResponse};
use crate::effect::log::{LogEntry, LogOp};
use crate::effect::random::RandomOp;
use crate::effect::storage::StorageOp;
use crate::effect::task::AsyncOp;
use crate::effect::timer::{TimerId, TimerOp};

// =============================================================================
// Category
// =============================================================================

/// The closed set of effect categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Dom,
    Http,
    Storage,
    Timer,
    Random,
    #[serde(rename = "datetime")]
    DateTime,
    Log,
    BrowserApi,
    Animation,
    Async,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Dom,
        Category::Http,
        Category::Storage,
        Category::Timer,
        Category::Random,
        Category::DateTime,
        Category::Log,
        Category::BrowserApi,
        Category::Animation,
        Category::Async,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Dom => "dom",
            Category::Http => "http",
            Category::Storage => "storage",
            Category::Timer => "timer",
            Category::Random => "random",
            Category::DateTime => "datetime",
            Category::Log => "log",
            Category::BrowserApi => "browser_api",
            Category::Animation => "animation",
            Category::Async => "async",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown effect category: {s}"))
    }
}

// =============================================================================
// Operations
// =============================================================================

/// The operation an effect describes, grouped by category.
#[derive(Debug)]
pub enum EffectOp {
    Dom(DomOp),
    Http(HttpOp),
    Storage(StorageOp),
    Timer(TimerOp),
    Random(RandomOp),
    DateTime(DateTimeOp),
    Log(LogOp),
    Browser(BrowserOp),
    Animation(AnimationOp),
    Async(AsyncOp),
}

impl EffectOp {
    pub fn category(&self) -> Category {
        match self {
            EffectOp::Dom(_) => Category::Dom,
            EffectOp::Http(_) => Category::Http,
            EffectOp::Storage(_) => Category::Storage,
            EffectOp::Timer(_) => Category::Timer,
            EffectOp::Random(_) => Category::Random,
            EffectOp::DateTime(_) => Category::DateTime,
            EffectOp::Log(_) => Category::Log,
            EffectOp::Browser(_) => Category::BrowserApi,
            EffectOp::Animation(_) => Category::Animation,
            EffectOp::Async(_) => Category::Async,
        }
    }

    /// camelCase operation name, e.g. `"setAttribute"`.
    pub fn operation(&self) -> &str {
        match self {
            EffectOp::Dom(op) => op.operation(),
            EffectOp::Http(op) => op.operation(),
            EffectOp::Storage(op) => op.operation(),
            EffectOp::Timer(op) => op.operation(),
            EffectOp::Random(op) => op.operation(),
            EffectOp::DateTime(op) => op.operation(),
            EffectOp::Log(op) => op.operation(),
            EffectOp::Browser(op) => op.operation(),
            EffectOp::Animation(op) => op.operation(),
            EffectOp::Async(op) => op.operation(),
        }
    }

    fn decode(category: Category, operation: &str, payload: Value) -> Self {
        match category {
            Category::Dom => EffectOp::Dom(decode_op(operation, payload)),
            Category::Http => EffectOp::Http(decode_op(operation, payload)),
            Category::Storage => EffectOp::Storage(StorageOp::decode(operation, payload)),
            Category::Timer => EffectOp::Timer(decode_op(operation, payload)),
            Category::Random => EffectOp::Random(decode_op(operation, payload)),
            Category::DateTime => EffectOp::DateTime(decode_op(operation, payload)),
            Category::Log => EffectOp::Log(decode_op(operation, payload)),
            Category::BrowserApi => EffectOp::Browser(decode_op(operation, payload)),
            Category::Animation => EffectOp::Animation(decode_op(operation, payload)),
            Category::Async => EffectOp::Async(AsyncOp::decode(operation, payload)),
        }
    }
}

macro_rules! effect_op_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for EffectOp {
            fn from(op: $ty) -> Self {
                EffectOp::$variant(op)
            }
        })*
    };
}

effect_op_from!(
    Dom(DomOp),
    Http(HttpOp),
    Storage(StorageOp),
    Timer(TimerOp),
    Random(RandomOp),
    DateTime(DateTimeOp),
    Log(LogOp),
    Browser(BrowserOp),
    Animation(AnimationOp),
    Async(AsyncOp),
);

/// An operation enum with a fallback for unrecognized records.
pub(crate) trait UnknownFallback {
    fn unknown(operation: String, payload: Value) -> Self;
}

/// Decode `{ "operation": .., ..payload }` into a typed op, or fall back to
/// the `Unknown` variant.
pub(crate) fn decode_op<T>(operation: &str, payload: Value) -> T
where
    T: DeserializeOwned + UnknownFallback,
{
    let mut record = match &payload {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        _ => return T::unknown(operation.to_string(), payload),
    };
    record.insert("operation".into(), Value::String(operation.to_string()));

    match serde_json::from_value(Value::Object(record)) {
        Ok(op) => op,
        Err(e) => {
            debug!(operation, error = %e, "payload did not decode, keeping as unknown");
            T::unknown(operation.to_string(), payload)
        }
    }
}

// =============================================================================
// Effect record
// =============================================================================

/// One side effect, described but not performed.
///
/// Not `Clone`: an effect is consumed by exactly one interpretation.
pub struct Effect {
    id: Uuid,
    op: EffectOp,
    timestamp: DateTime<Utc>,
}

impl Effect {
    pub fn new(op: impl Into<EffectOp>) -> Self {
        Self {
            id: Uuid::new_v4(),
            op: op.into(),
            timestamp: Utc::now(),
        }
    }

    /// Build an effect from its wire parts. Never fails: operations this
    /// build does not know, or payloads of the wrong shape, become the
    /// category's `Unknown` variant and are rejected at execution time.
    pub fn from_parts(category: Category, operation: &str, payload: Value) -> Self {
        Self::new(EffectOp::decode(category, operation, payload))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the effect was described. Informational only.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn category(&self) -> Category {
        self.op.category()
    }

    pub fn operation(&self) -> &str {
        self.op.operation()
    }

    pub fn op(&self) -> &EffectOp {
        &self.op
    }

    pub fn into_op(self) -> EffectOp {
        self.op
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("category", &self.category())
            .field("operation", &self.operation())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

// =============================================================================
// Results
// =============================================================================

/// The "right" value of an effect execution.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectValue {
    Unit,
    Node(NodeId),
    Nodes(Vec<NodeId>),
    MaybeNode(Option<NodeId>),
    Bool(bool),
    Text(String),
    MaybeText(Option<String>),
    Number(f64),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Timer(TimerId),
    Frame(FrameId),
    Listener(ListenerId),
    Http(HttpResponse),
    Log(LogEntry),
    Position(GeoPosition),
    Notification(NotificationHandle),
    Json(Value),
}

impl EffectValue {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            EffectValue::Node(id) | EffectValue::MaybeNode(Some(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EffectValue::Text(s) | EffectValue::MaybeText(Some(s)) => Some(s),
            _ => None,
        }
    }
}
