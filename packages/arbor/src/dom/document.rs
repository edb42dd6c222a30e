//! In-memory document: an arena of nodes with stable ids.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::future::Future;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::selector::{Selector, SelectorContext};
use super::{DomEvent, Host, ListenerId, NodeId, ScrollOptions};
use crate::error::HostError;
use crate::outcome::attempt;
use crate::sanitize::{
    check_attribute_name, check_class_name, check_style_property, split_declarations, NameError,
};
use crate::vnode::EventHandler;

/// Document loading phase, observed by the `domReady` effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

struct Node {
    parent: Option<NodeId>,
    data: NodeData,
}

enum NodeData {
    Element(Element),
    Text(String),
}

struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<NodeId>,
    handlers: BTreeMap<String, EventHandler>,
    listeners: Vec<Listener>,
}

struct Listener {
    id: ListenerId,
    event: String,
    handler: EventHandler,
}

/// An in-memory host document rooted at `<html><body></body></html>`.
///
/// Released slots go on a free list and are handed out again with a bumped
/// generation, so the arena grows with the peak number of live nodes. A slot
/// whose generation is exhausted is retired.
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    root: NodeId,
    body: NodeId,
    focused: Option<NodeId>,
    last_scroll: Option<(NodeId, ScrollOptions)>,
    next_listener: u64,
    ready: watch::Sender<ReadyState>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document in the [`ReadyState::Loading`] phase.
    pub fn new() -> Self {
        let (ready, _) = watch::channel(ReadyState::Loading);
        let root = NodeId::new(0, 0);
        let body = NodeId::new(1, 0);
        let mut html = Element::new("html");
        html.children.push(body);
        let slots = vec![
            Slot {
                generation: 0,
                node: Some(Node {
                    parent: None,
                    data: NodeData::Element(html),
                }),
            },
            Slot {
                generation: 0,
                node: Some(Node {
                    parent: Some(root),
                    data: NodeData::Element(Element::new("body")),
                }),
            },
        ];
        Self {
            slots,
            free: Vec::new(),
            live: 2,
            root,
            body,
            focused: None,
            last_scroll: None,
            next_listener: 0,
            ready,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.ready.borrow()
    }

    /// Move to [`ReadyState::Interactive`], waking every pending ready waiter.
    pub fn mark_interactive(&mut self) {
        self.ready.send_replace(ReadyState::Interactive);
    }

    pub fn mark_complete(&mut self) {
        self.ready.send_replace(ReadyState::Complete);
    }

    /// Resolves once the document has left the loading phase.
    ///
    /// The future does not borrow the document. It yields false if the
    /// document was dropped while still loading.
    pub fn ready_signal(&self) -> impl Future<Output = bool> + Send + 'static {
        let mut rx = self.ready.subscribe();
        async move { rx.wait_for(|state| *state != ReadyState::Loading).await.is_ok() }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn last_scroll(&self) -> Option<(NodeId, ScrollOptions)> {
        self.last_scroll
    }

    /// Number of live nodes, attached or not.
    pub fn live_nodes(&self) -> usize {
        self.live
    }

    /// Arena slots allocated so far, live or free.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Tag of an element, `None` for text or released nodes.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.get(node).map(|n| &n.data) {
            Some(NodeData::Element(el)) => Some(el.tag.as_str()),
            _ => None,
        }
    }

    /// Children of a node in order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match self.get(node).map(|n| &n.data) {
            Some(NodeData::Element(el)) => &el.children,
            _ => &[],
        }
    }

    /// Dispatch an event at `target`, bubbling through its ancestors.
    ///
    /// Each handler runs under a panic guard; a panicking handler is logged and
    /// the remaining handlers still run. Returns the number of handlers invoked.
    pub fn dispatch_event(
        &self,
        target: NodeId,
        name: &str,
        detail: serde_json::Value,
    ) -> usize {
        let name = name.to_ascii_lowercase();
        let mut invoked = 0;
        let mut current = Some(target);

        while let Some(node) = current {
            let handlers: Vec<EventHandler> = match self.get(node).map(|n| &n.data) {
                Some(NodeData::Element(el)) => el
                    .handlers
                    .get(&name)
                    .cloned()
                    .into_iter()
                    .chain(
                        el.listeners
                            .iter()
                            .filter(|l| l.event == name)
                            .map(|l| l.handler.clone()),
                    )
                    .collect(),
                _ => Vec::new(),
            };

            let event = DomEvent {
                name: name.clone(),
                target,
                current_target: node,
                detail: detail.clone(),
            };
            for handler in handlers {
                invoked += 1;
                if let Err(caught) = attempt(|| handler.call(&event)) {
                    warn!(
                        event = %name,
                        node = %node,
                        panic = %caught.message,
                        "event handler panicked"
                    );
                }
            }

            current = self.get(node).and_then(|n| n.parent);
        }
        invoked
    }

    /// Serialize a node and its subtree. Attributes are emitted sorted by
    /// name; stored text is already escaped and is emitted as-is.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// Serialize only the children of a node.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(*child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match self.get(node).map(|n| &n.data) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element(el)) => {
                out.push('<');
                out.push_str(&el.tag);
                let mut attributes: Vec<_> = el.attributes.iter().collect();
                attributes.sort_by(|a, b| a.0.cmp(&b.0));
                for (name, value) in attributes {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{value}\"");
                    }
                }
                out.push('>');
                for child in &el.children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{}>", el.tag);
            }
            None => {}
        }
    }

    // =========================================================================
    // Arena internals
    // =========================================================================

    fn push(&mut self, data: NodeData) -> Result<NodeId, HostError> {
        let node = Node { parent: None, data };
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.node = Some(node);
                self.live += 1;
                return Ok(NodeId::new(index, slot.generation));
            }
        }
        let index = u32::try_from(self.slots.len()).map_err(|_| HostError::CapacityExceeded)?;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        self.live += 1;
        Ok(NodeId::new(index, 0))
    }

    /// Empty a slot and queue it for reuse under the next generation.
    fn vacate(&mut self, id: NodeId) {
        let Some(slot) = self.slots.get_mut(id.index() as usize) else {
            return;
        };
        if slot.generation != id.generation() || slot.node.take().is_none() {
            return;
        }
        self.live -= 1;
        match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                self.free.push(id.index());
            }
            None => debug!(slot = id.index(), "retiring exhausted arena slot"),
        }
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    fn node(&self, id: NodeId) -> Result<&Node, HostError> {
        self.get(id).ok_or(HostError::NoSuchNode(id))
    }

    fn element(&self, id: NodeId) -> Result<&Element, HostError> {
        match &self.node(id)?.data {
            NodeData::Element(el) => Ok(el),
            NodeData::Text(_) => Err(HostError::NotAnElement(id)),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, HostError> {
        match self.get_mut(id) {
            Some(Node {
                data: NodeData::Element(el),
                ..
            }) => Ok(el),
            Some(_) => Err(HostError::NotAnElement(id)),
            None => Err(HostError::NoSuchNode(id)),
        }
    }

    /// True if `ancestor` is `node` or one of its ancestors.
    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.get(child).and_then(|n| n.parent) else {
            return;
        };
        if let Ok(el) = self.element_mut(parent) {
            el.children.retain(|c| *c != child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = None;
        }
    }

    /// Attach a detached `child` under `parent` at `index` (append when `None`).
    fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Ok(el) = self.element_mut(parent) {
            match index {
                Some(i) if i <= el.children.len() => el.children.insert(i, child),
                _ => el.children.push(child),
            }
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        self.element(parent)?;
        self.node(child)?;
        if self.is_inclusive_ancestor(child, parent) {
            return Err(HostError::Cycle { parent, child });
        }
        Ok(())
    }

    fn check_child(&self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        self.element(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Err(HostError::NotAChild { parent, child });
        }
        Ok(())
    }

    fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Attached elements in document order.
    fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.subtree(self.root)
            .into_iter()
            .filter(move |id| self.tag(*id).is_some())
    }

    fn class_tokens(&self, node: NodeId) -> Result<Vec<String>, HostError> {
        Ok(self
            .attribute(node, "class")?
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default())
    }

    fn write_classes(&mut self, node: NodeId, classes: &[String]) -> Result<(), HostError> {
        if classes.is_empty() {
            self.remove_attribute(node, "class")
        } else {
            self.set_attribute(node, "class", &classes.join(" "))
        }
    }

    fn style_declarations(&self, node: NodeId) -> Result<Vec<(String, String)>, HostError> {
        Ok(parse_style(&self.attribute(node, "style")?.unwrap_or_default()))
    }

    fn write_style(
        &mut self,
        node: NodeId,
        declarations: &[(String, String)],
    ) -> Result<(), HostError> {
        if declarations.is_empty() {
            return self.remove_attribute(node, "style");
        }
        let style = declarations
            .iter()
            .map(|(n, v)| format!("{n}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attribute(node, "style", &style)
    }
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            handlers: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }
}

fn invalid_attribute(name: &str) -> impl FnOnce(NameError) -> HostError + '_ {
    move |reason| HostError::InvalidAttribute {
        name: name.to_string(),
        reason,
    }
}

fn invalid_class(class: &str) -> impl FnOnce(NameError) -> HostError + '_ {
    move |reason| HostError::InvalidClass {
        class: class.to_string(),
        reason,
    }
}

fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    split_declarations(style)
        .into_iter()
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

impl SelectorContext for Document {
    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.tag(node)
    }

    fn attribute_value(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)
            .ok()?
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.parent)
    }
}

// =============================================================================
// Host implementation
// =============================================================================

impl Host for Document {
    fn create_element(&mut self, tag: &str) -> Result<NodeId, HostError> {
        if !is_valid_tag(tag) {
            return Err(HostError::InvalidTag(tag.to_string()));
        }
        self.push(NodeData::Element(Element::new(tag)))
    }

    fn create_text(&mut self, text: &str) -> Result<NodeId, HostError> {
        self.push(NodeData::Text(text.to_string()))
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), HostError> {
        match self.get_mut(node) {
            Some(Node {
                data: NodeData::Text(content),
                ..
            }) => {
                *content = text.to_string();
                Ok(())
            }
            Some(_) => Err(HostError::NotText(node)),
            None => Err(HostError::NoSuchNode(node)),
        }
    }

    fn text_content(&self, node: NodeId) -> Result<String, HostError> {
        match &self.node(node)?.data {
            NodeData::Text(text) => Ok(text.clone()),
            NodeData::Element(el) => {
                let mut out = String::new();
                for child in &el.children {
                    out.push_str(&self.text_content(*child)?);
                }
                Ok(out)
            }
        }
    }

    fn replace_children_with_text(&mut self, node: NodeId, text: &str) -> Result<(), HostError> {
        let old = self.element(node)?.children.clone();
        for child in old {
            self.release(child);
        }
        let text_node = self.create_text(text)?;
        self.attach(node, text_node, None);
        Ok(())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), HostError> {
        check_attribute_name(name).map_err(invalid_attribute(name))?;
        let el = self.element_mut(node)?;
        match el.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => el.attributes.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError> {
        check_attribute_name(name).map_err(invalid_attribute(name))?;
        self.element_mut(node)?.attributes.retain(|(n, _)| n != name);
        Ok(())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError> {
        Ok(self
            .element(node)?
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone()))
    }

    fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), HostError> {
        check_class_name(class).map_err(invalid_class(class))?;
        let mut classes = self.class_tokens(node)?;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        self.write_classes(node, &classes)
    }

    fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), HostError> {
        check_class_name(class).map_err(invalid_class(class))?;
        let mut classes = self.class_tokens(node)?;
        classes.retain(|c| c != class);
        self.write_classes(node, &classes)
    }

    fn has_class(&self, node: NodeId, class: &str) -> Result<bool, HostError> {
        check_class_name(class).map_err(invalid_class(class))?;
        Ok(self.class_tokens(node)?.iter().any(|c| c == class))
    }

    fn set_style_property(
        &mut self,
        node: NodeId,
        property: &str,
        value: &str,
    ) -> Result<(), HostError> {
        let refuse = |reason: String| HostError::InvalidStyle {
            property: property.to_string(),
            reason,
        };
        check_style_property(property).map_err(|e| refuse(e.to_string()))?;
        if split_declarations(value).len() > 1 {
            return Err(refuse("value holds more than one declaration".into()));
        }

        let mut declarations = self.style_declarations(node)?;
        let value = value.trim().to_string();
        match declarations.iter_mut().find(|(n, _)| n == property) {
            Some((_, existing)) => *existing = value,
            None => declarations.push((property.to_string(), value)),
        }
        self.write_style(node, &declarations)
    }

    fn remove_style_property(&mut self, node: NodeId, property: &str) -> Result<(), HostError> {
        let mut declarations = self.style_declarations(node)?;
        let before = declarations.len();
        declarations.retain(|(n, _)| n != property);
        if declarations.len() == before {
            return Ok(());
        }
        self.write_style(node, &declarations)
    }

    fn set_event_handler(
        &mut self,
        node: NodeId,
        event: &str,
        handler: Option<EventHandler>,
    ) -> Result<(), HostError> {
        let el = self.element_mut(node)?;
        let event = event.to_ascii_lowercase();
        match handler {
            Some(handler) => {
                el.handlers.insert(event, handler);
            }
            None => {
                el.handlers.remove(&event);
            }
        }
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<ListenerId, HostError> {
        let id = ListenerId::from_raw(self.next_listener);
        let el = self.element_mut(node)?;
        el.listeners.push(Listener {
            id,
            event: event.to_ascii_lowercase(),
            handler,
        });
        self.next_listener += 1;
        Ok(id)
    }

    fn remove_event_listener(
        &mut self,
        node: NodeId,
        listener: ListenerId,
    ) -> Result<bool, HostError> {
        let el = self.element_mut(node)?;
        let before = el.listeners.len();
        el.listeners.retain(|l| l.id != listener);
        Ok(el.listeners.len() != before)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        self.insert_before(parent, child, None)
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), HostError> {
        self.check_insertable(parent, child)?;
        if let Some(reference) = reference {
            self.check_child(parent, reference)?;
            if reference == child {
                return Ok(());
            }
        }
        self.detach(child);
        let index = match reference {
            Some(reference) => self.children(parent).iter().position(|c| *c == reference),
            None => None,
        };
        self.attach(parent, child, index);
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        self.check_child(parent, child)?;
        self.detach(child);
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
    ) -> Result<(), HostError> {
        self.check_child(parent, old)?;
        if new == old {
            return Ok(());
        }
        self.check_insertable(parent, new)?;
        self.detach(new);
        let index = self.children(parent).iter().position(|c| *c == old);
        self.detach(old);
        self.attach(parent, new, index);
        Ok(())
    }

    fn release(&mut self, node: NodeId) {
        if node == self.root || !self.exists(node) {
            return;
        }
        self.detach(node);
        let doomed = self.subtree(node);
        debug!(node = %node, count = doomed.len(), "releasing subtree");
        for id in doomed {
            if self.focused == Some(id) {
                self.focused = None;
            }
            self.vacate(id);
        }
    }

    fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.children(parent).get(index).copied()
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.children(parent).len()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.parent)
    }

    fn exists(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.tag(node).is_some()
    }

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, HostError> {
        let selector = Selector::parse(selector)?;
        Ok(self.elements().find(|id| selector.matches(self, *id)))
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, HostError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .elements()
            .filter(|id| selector.matches(self, *id))
            .collect())
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .find(|node| self.attribute_value(*node, "id") == Some(id))
    }

    fn focus(&mut self, node: NodeId) -> Result<(), HostError> {
        self.element(node)?;
        self.focused = Some(node);
        Ok(())
    }

    fn scroll_into_view(&mut self, node: NodeId, options: ScrollOptions) -> Result<(), HostError> {
        self.element(node)?;
        self.last_scroll = Some((node, options));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn list(doc: &mut Document, items: &[&str]) -> (NodeId, Vec<NodeId>) {
        let ul = doc.create_element("ul").unwrap();
        let mut ids = Vec::new();
        for item in items {
            let li = doc.create_element("li").unwrap();
            let text = doc.create_text(item).unwrap();
            doc.append_child(li, text).unwrap();
            doc.append_child(ul, li).unwrap();
            ids.push(li);
        }
        doc.append_child(doc.body(), ul).unwrap();
        (ul, ids)
    }

    #[test]
    fn test_new_document_shape() {
        let doc = Document::new();
        assert_eq!(doc.to_html(doc.root()), "<html><body></body></html>");
        assert_eq!(doc.ready_state(), ReadyState::Loading);
    }

    #[test]
    fn test_rejects_invalid_tags() {
        let mut doc = Document::new();
        assert_eq!(
            doc.create_element("1div"),
            Err(HostError::InvalidTag("1div".into()))
        );
        assert!(doc.create_element("").is_err());
        assert!(doc.create_element("my-widget").is_ok());
    }

    #[test]
    fn test_insert_before_moves_existing_child() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a", "b", "c"]);

        doc.insert_before(ul, ids[2], Some(ids[0])).unwrap();

        assert_eq!(doc.children(ul), &[ids[2], ids[0], ids[1]]);
        assert_eq!(doc.text_content(ul).unwrap(), "cab");
    }

    #[test]
    fn test_insert_rejects_cycles() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a"]);

        assert_eq!(
            doc.append_child(ids[0], ul),
            Err(HostError::Cycle {
                parent: ids[0],
                child: ul
            })
        );
        assert_eq!(
            doc.append_child(ul, ul),
            Err(HostError::Cycle {
                parent: ul,
                child: ul
            })
        );
    }

    #[test]
    fn test_remove_child_requires_parentage() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a"]);
        let stray = doc.create_element("p").unwrap();

        assert!(matches!(
            doc.remove_child(ul, stray),
            Err(HostError::NotAChild { .. })
        ));
        doc.remove_child(ul, ids[0]).unwrap();
        assert!(doc.exists(ids[0]));
        assert_eq!(doc.parent(ids[0]), None);
    }

    #[test]
    fn test_replace_child_keeps_position() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a", "b", "c"]);
        let replacement = doc.create_element("li").unwrap();

        doc.replace_child(ul, replacement, ids[1]).unwrap();

        assert_eq!(doc.children(ul), &[ids[0], replacement, ids[2]]);
        assert_eq!(doc.parent(ids[1]), None);
    }

    #[test]
    fn test_release_drops_subtree() {
        let mut doc = Document::new();
        let before = doc.live_nodes();
        let (ul, _) = list(&mut doc, &["a", "b"]);
        assert_eq!(doc.live_nodes(), before + 5);

        doc.release(ul);

        assert_eq!(doc.live_nodes(), before);
        assert!(!doc.exists(ul));
        assert_eq!(doc.child_count(doc.body()), 0);
    }

    #[test]
    fn test_released_slots_are_reused_with_new_generation() {
        let mut doc = Document::new();
        let first = doc.create_element("p").unwrap();
        doc.release(first);

        let second = doc.create_element("p").unwrap();

        assert_eq!(second.index(), first.index());
        assert_ne!(second, first);
        assert!(!doc.exists(first));
        assert!(doc.exists(second));
        assert_eq!(doc.tag(first), None);
        assert_eq!(
            doc.set_attribute(first, "id", "x"),
            Err(HostError::NoSuchNode(first))
        );
    }

    #[test]
    fn test_arena_stays_bounded_under_replacement() {
        let mut doc = Document::new();
        let body = doc.body();
        let mut current = doc.create_element("div").unwrap();
        doc.append_child(body, current).unwrap();

        for i in 0..20_000 {
            let next = doc.create_element("div").unwrap();
            let text = doc.create_text(&i.to_string()).unwrap();
            doc.append_child(next, text).unwrap();
            doc.replace_child(body, next, current).unwrap();
            doc.release(current);
            current = next;
        }

        assert_eq!(doc.live_nodes(), 4);
        assert!(doc.slot_count() <= 8, "slots grew to {}", doc.slot_count());
        assert_eq!(doc.inner_html(body), "<div>19999</div>");
    }

    #[test]
    fn test_node_id_wire_form() {
        let id = NodeId::new(5, 2);
        assert_eq!(NodeId::from_raw(id.raw()), id);
        assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!((2u64 << 32) | 5));

        let plain: NodeId = serde_json::from_value(serde_json::json!(4)).unwrap();
        assert_eq!((plain.index(), plain.generation()), (4, 0));
        assert_eq!(plain.to_string(), "#4");
        assert_eq!(id.to_string(), "#5.2");
    }

    #[test]
    fn test_rejects_unserializable_names() {
        let mut doc = Document::new();
        let div = doc.create_element("div").unwrap();

        assert!(matches!(
            doc.set_attribute(div, "x onclick", "alert(1)"),
            Err(HostError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            doc.remove_attribute(div, "a=b"),
            Err(HostError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            doc.add_class(div, "a\" onclick=\"x"),
            Err(HostError::InvalidClass { .. })
        ));
        assert!(matches!(
            doc.has_class(div, "a b"),
            Err(HostError::InvalidClass { .. })
        ));
        assert!(matches!(
            doc.set_style_property(div, "color:red;x", "y"),
            Err(HostError::InvalidStyle { .. })
        ));
        assert!(matches!(
            doc.set_style_property(div, "color", "red; position: fixed"),
            Err(HostError::InvalidStyle { .. })
        ));
        assert_eq!(doc.to_html(div), "<div></div>");
    }

    #[test]
    fn test_style_values_keep_entities_and_can_be_removed() {
        let mut doc = Document::new();
        let div = doc.create_element("div").unwrap();

        doc.set_style_property(div, "font-family", "&quot;Fira&quot;").unwrap();
        doc.set_style_property(div, "color", "red").unwrap();
        assert_eq!(
            doc.attribute(div, "style").unwrap().as_deref(),
            Some("font-family: &quot;Fira&quot;; color: red")
        );

        doc.remove_style_property(div, "font-family").unwrap();
        assert_eq!(doc.attribute(div, "style").unwrap().as_deref(), Some("color: red"));
        doc.remove_style_property(div, "color").unwrap();
        assert_eq!(doc.attribute(div, "style").unwrap(), None);
    }

    #[test]
    fn test_attributes_classes_and_style() {
        let mut doc = Document::new();
        let div = doc.create_element("div").unwrap();

        doc.set_attribute(div, "id", "main").unwrap();
        doc.add_class(div, "a").unwrap();
        doc.add_class(div, "b").unwrap();
        doc.add_class(div, "a").unwrap();
        doc.remove_class(div, "a").unwrap();
        doc.set_style_property(div, "color", "red").unwrap();
        doc.set_style_property(div, "margin", "0").unwrap();
        doc.set_style_property(div, "color", "blue").unwrap();

        assert!(doc.has_class(div, "b").unwrap());
        assert!(!doc.has_class(div, "a").unwrap());
        assert_eq!(
            doc.to_html(div),
            r#"<div class="b" id="main" style="color: blue; margin: 0"></div>"#
        );
    }

    #[test]
    fn test_text_operations_reject_elements() {
        let mut doc = Document::new();
        let div = doc.create_element("div").unwrap();
        assert_eq!(doc.set_text(div, "x"), Err(HostError::NotText(div)));

        let text = doc.create_text("x").unwrap();
        assert_eq!(
            doc.set_attribute(text, "id", "y"),
            Err(HostError::NotAnElement(text))
        );
    }

    #[test]
    fn test_handler_slot_and_listeners_both_fire() {
        let mut doc = Document::new();
        let (_, ids) = list(&mut doc, &["a"]);
        let hits = Arc::new(AtomicUsize::new(0));

        let slot_hits = hits.clone();
        doc.set_event_handler(
            ids[0],
            "click",
            Some(EventHandler::new(move |_| {
                slot_hits.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .unwrap();
        let listener_hits = hits.clone();
        let listener = doc
            .add_event_listener(
                ids[0],
                "click",
                EventHandler::new(move |_| {
                    listener_hits.fetch_add(10, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(doc.dispatch_event(ids[0], "click", serde_json::Value::Null), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 11);

        doc.set_event_handler(ids[0], "click", None).unwrap();
        assert_eq!(doc.dispatch_event(ids[0], "click", serde_json::Value::Null), 1);

        assert!(doc.remove_event_listener(ids[0], listener).unwrap());
        assert!(!doc.remove_event_listener(ids[0], listener).unwrap());
        assert_eq!(doc.dispatch_event(ids[0], "click", serde_json::Value::Null), 0);
    }

    #[test]
    fn test_events_bubble_and_survive_panics() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a"]);
        let seen = Arc::new(AtomicUsize::new(0));

        doc.set_event_handler(ids[0], "click", Some(EventHandler::new(|_| panic!("bad handler"))))
            .unwrap();
        let parent_seen = seen.clone();
        let target = ids[0];
        doc.set_event_handler(
            ul,
            "click",
            Some(EventHandler::new(move |event| {
                if event.target == target && event.current_target == ul {
                    parent_seen.fetch_add(1, Ordering::SeqCst);
                }
            })),
        )
        .unwrap();

        assert_eq!(doc.dispatch_event(ids[0], "click", serde_json::Value::Null), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queries() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a", "b"]);
        doc.set_attribute(ul, "id", "items").unwrap();
        doc.add_class(ids[1], "active").unwrap();
        let detached = doc.create_element("li").unwrap();

        assert_eq!(doc.query_selector("li").unwrap(), Some(ids[0]));
        assert_eq!(doc.query_selector("#items > li.active").unwrap(), Some(ids[1]));
        assert_eq!(doc.query_selector_all("body li").unwrap(), ids);
        assert!(!doc.query_selector_all("li").unwrap().contains(&detached));
        assert_eq!(doc.element_by_id("items"), Some(ul));
        assert_eq!(doc.element_by_id("missing"), None);
        assert!(doc.query_selector("li >").is_err());
    }

    #[test]
    fn test_focus_and_scroll() {
        let mut doc = Document::new();
        let (ul, _) = list(&mut doc, &["a"]);
        doc.focus(ul).unwrap();
        doc.scroll_into_view(ul, ScrollOptions::default()).unwrap();
        assert_eq!(doc.focused(), Some(ul));
        assert_eq!(doc.last_scroll(), Some((ul, ScrollOptions::default())));

        doc.release(ul);
        assert_eq!(doc.focused(), None);
    }

    #[tokio::test]
    async fn test_ready_signal_resolves_after_interactive() {
        let mut doc = Document::new();
        let signal = doc.ready_signal();
        let waiter = tokio::spawn(signal);

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        doc.mark_interactive();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_ready_signal_immediate_when_ready() {
        let mut doc = Document::new();
        doc.mark_complete();
        assert!(doc.ready_signal().await);
    }
}
