//! # Arbor
//!
//! A declarative UI engine where pure code describes trees and side effects
//! as data, and separate interpreters apply them.
//!
//! ## Core Concepts
//!
//! Arbor separates **description** from **execution**:
//! - [`VNode`] = what the document should look like
//! - [`Effect`](effect::Effect) = a side effect that should happen
//!
//! Neither touches the world when built. A [`Renderer`] turns successive
//! trees into minimal document mutations; an [`Environment`](effect::Environment)
//! interprets effects against live capabilities.
//!
//! ## Architecture
//!
//! ```text
//! component code
//!     │
//!     ├─► element("ul")...build() ─► VNode ───────────┐
//!     │                                               │
//!     │                             Renderer.render() │
//!     │                                    │          │
//!     │              ┌─────────────────────┤          │
//!     │              │ first render        │ later    │
//!     │              ▼                     ▼          │
//!     │         materialize()       diff(old, new)    │
//!     │              │                     │ Patch    │
//!     │              │                     ▼          │
//!     │              │               apply() ─► ApplyReport
//!     │              ▼                     │
//!     │           Host (Document) ◄────────┘
//!     │
//!     └─► effect::http::get(..) ─► Effect ─► Environment.execute()
//!                                                │
//!                                                ├─► Ready(Result)
//!                                                └─► Pending(future)
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Trees are immutable** - No API mutates a constructed node
//! 2. **Diffing is pure** - Same two trees, same patch, no host access
//! 3. **One vnode, one host node** - Components and error placeholders included
//! 4. **Failures are data** - Component errors render inline, patch failures
//!    land in the report, effect failures come back as [`EffectError`]
//! 5. **Effects are inert** - Only [`Environment::execute`](effect::Environment::execute)
//!    performs them
//!
//! ## Example
//!
//! ```ignore
//! use arbor::{element, Document, Renderer, VNode, VNodeError};
//!
//! let mut doc = Document::new();
//! let mut renderer = Renderer::new(doc.body());
//!
//! let list = |items: &[&str]| -> Result<VNode, VNodeError> {
//!     let rows = items
//!         .iter()
//!         .map(|i| element("li").key(*i).child(*i).build())
//!         .collect::<Result<Vec<_>, _>>()?;
//!     element("ul").children(rows).build()
//! };
//!
//! renderer.render(&mut doc, Some(list(&["a", "b"])?))?;
//! // Swapping keyed items moves the existing nodes.
//! renderer.render(&mut doc, Some(list(&["b", "a"])?))?;
//! ```

pub mod apply;
pub mod component;
pub mod config;
pub mod create;
pub mod diff;
pub mod dom;
pub mod effect;
pub mod error;
pub mod mount;
pub mod outcome;
pub mod patch;
pub mod props;
pub mod sanitize;
pub mod vnode;

// Re-export the reconciler entry points
pub use apply::apply;
pub use component::resolve;
pub use create::materialize;
pub use diff::{diff, diff_optional};
pub use mount::{MountedTree, RenderOutcome, Renderer};

// Re-export tree construction
pub use vnode::{
    create, element, text, AttrValue, Attrs, Child, Component, ElementBuilder, EventHandler, Key,
    Kind, PropValue, Props, VNode,
};

// Re-export patch data
pub use patch::{ChildOp, NodePath, Patch, PatchOp, PropChange};

// Re-export host types
pub use dom::{Document, DomEvent, Host, ListenerId, NodeId};

// Re-export error types
pub use error::{ApplyReport, EffectError, HostError, PatchFailure, RenderError, VNodeError};

// Re-export effect entry points
pub use effect::{Category, Completion, Effect, EffectResult, EffectValue, Environment};

pub use config::EngineConfig;

// Re-export commonly used external types
pub use async_trait::async_trait;
