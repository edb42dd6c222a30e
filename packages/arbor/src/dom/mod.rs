//! The host document seam.
//!
//! The reconciler and the DOM executor never talk to a concrete document;
//! they go through [`Host`]. [`Document`] is the in-memory implementation the
//! crate ships with: an arena of nodes addressed by stable [`NodeId`]s.
//!
//! # Handler slots vs listeners
//!
//! A host keeps two kinds of event handlers per element:
//!
//! - one **handler slot** per event name, written by the property setter when
//!   an `on*` prop is set or removed
//! - any number of **listeners**, added and removed imperatively by effects
//!
//! Both fire on dispatch. Keeping them apart means a re-render that drops an
//! `onClick` prop never removes a listener some effect registered.

mod document;
mod selector;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use document::{Document, ReadyState};
pub use selector::Selector;

use crate::error::HostError;
use crate::vnode::EventHandler;

// =============================================================================
// Identifiers
// =============================================================================

/// Handle to a node in a host document.
///
/// A handle pairs an arena slot with the generation that slot had when the
/// node was created. Slots are reused after release, so a handle kept past
/// [`Host::release`] stops resolving instead of reaching the slot's next
/// occupant. On the wire it is a single integer, generation in the high
/// 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct NodeId {
    generation: u32,
    index: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        NodeId { generation, index }
    }

    pub const fn from_raw(raw: u64) -> Self {
        NodeId {
            generation: (raw >> 32) as u32,
            index: raw as u32,
        }
    }

    pub const fn raw(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Arena slot of the node.
    pub const fn index(self) -> u32 {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        NodeId::from_raw(raw)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.raw()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}.{}", self.index, self.generation)
        }
    }
}

/// Handle returned when a listener is added, used to remove it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(u64);

impl ListenerId {
    pub const fn from_raw(raw: u64) -> Self {
        ListenerId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

// =============================================================================
// Events
// =============================================================================

/// An event delivered to handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    /// Lower-case event name (`click`, `input`).
    pub name: String,
    /// Node the event was dispatched on.
    pub target: NodeId,
    /// Node whose handler is currently running.
    pub current_target: NodeId,
    /// Free-form event data.
    pub detail: serde_json::Value,
}

/// How an element should be scrolled into view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrollOptions {
    pub behavior: ScrollBehavior,
    pub block: ScrollAlignment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
    Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlignment {
    #[default]
    Start,
    Center,
    End,
    Nearest,
}

// =============================================================================
// Host trait
// =============================================================================

/// The document operations the engine relies on.
///
/// Node ids handed out by one host are meaningless to another. Detached nodes
/// stay alive until [`Host::release`] is called on them.
pub trait Host {
    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> Result<NodeId, HostError>;

    /// Create a detached text node holding already-escaped text.
    fn create_text(&mut self, text: &str) -> Result<NodeId, HostError>;

    /// Replace the content of a text node.
    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), HostError>;

    /// Concatenated text of a node and its descendants.
    fn text_content(&self, node: NodeId) -> Result<String, HostError>;

    /// Remove every child of an element and append a single text node.
    fn replace_children_with_text(&mut self, node: NodeId, text: &str) -> Result<(), HostError>;

    /// Set an attribute to an already-escaped value. Names that cannot be
    /// serialized are rejected with [`HostError::InvalidAttribute`].
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), HostError>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError>;

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError>;

    fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), HostError>;

    fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), HostError>;

    fn has_class(&self, node: NodeId, class: &str) -> Result<bool, HostError>;

    /// Set one declaration inside the element's `style` attribute.
    ///
    /// `value` is already escaped and must hold a single declaration value.
    fn set_style_property(&mut self, node: NodeId, property: &str, value: &str)
        -> Result<(), HostError>;

    /// Drop one declaration from the `style` attribute, removing the
    /// attribute once it is empty.
    fn remove_style_property(&mut self, node: NodeId, property: &str) -> Result<(), HostError>;

    /// Write (or clear, with `None`) the handler slot for `event`.
    fn set_event_handler(
        &mut self,
        node: NodeId,
        event: &str,
        handler: Option<EventHandler>,
    ) -> Result<(), HostError>;

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<ListenerId, HostError>;

    /// Returns false when the listener was not registered on `node`.
    fn remove_event_listener(&mut self, node: NodeId, listener: ListenerId)
        -> Result<bool, HostError>;

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError>;

    /// Insert `child` before `reference`, or append when `reference` is `None`.
    /// A child that is already attached elsewhere is moved.
    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), HostError>;

    /// Detach `child` from `parent`. The node stays alive.
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError>;

    /// Put `new` where `old` is. `old` is detached but stays alive.
    fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId)
        -> Result<(), HostError>;

    /// Drop a detached node and its subtree.
    fn release(&mut self, node: NodeId);

    fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId>;

    fn child_count(&self, parent: NodeId) -> usize;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn exists(&self, node: NodeId) -> bool;

    fn is_element(&self, node: NodeId) -> bool;

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, HostError>;

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, HostError>;

    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    fn focus(&mut self, node: NodeId) -> Result<(), HostError>;

    fn scroll_into_view(&mut self, node: NodeId, options: ScrollOptions) -> Result<(), HostError>;
}
