//! Virtual nodes: immutable descriptions of the tree a document should hold.
//!
//! A [`VNode`] is cheap to clone (one `Arc` bump) and never mutated after
//! construction. Trees are built with [`create`], [`element`] or [`text`]; the
//! factory flattens nested child lists, drops empty children, escapes string
//! props and lifts `key` out of the props.
//!
//! ```ignore
//! let list = element("ul")
//!     .attr("className", "todo")
//!     .children(items.iter().map(|item| {
//!         element("li").key(item.id).child(text(&item.title)).build()
//!     }).collect::<Result<Vec<_>, _>>()?)
//!     .build()?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::dom::DomEvent;
use crate::error::VNodeError;
use crate::sanitize::{
    check_attribute_name, check_style_property, is_event_prop, split_declarations, SafeText,
};

// =============================================================================
// Keys
// =============================================================================

/// Stable identity of a child among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Arc<str>);

impl Key {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(Arc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(Arc::from(s))
    }
}

macro_rules! key_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Key {
            fn from(n: $t) -> Self {
                Key(Arc::from(n.to_string()))
            }
        })*
    };
}

key_from_int!(i32, i64, u32, u64, usize);

// =============================================================================
// Handlers and components
// =============================================================================

type HandlerFn = dyn Fn(&DomEvent) + Send + Sync;

/// An event handler value. Two handlers are equal only if they are the same
/// allocation, so a re-render that recreates a closure produces a prop change.
#[derive(Clone)]
pub struct EventHandler(Arc<HandlerFn>);

impl EventHandler {
    pub fn new(f: impl Fn(&DomEvent) + Send + Sync + 'static) -> Self {
        EventHandler(Arc::new(f))
    }

    pub fn call(&self, event: &DomEvent) {
        (self.0)(event)
    }

    pub fn same(&self, other: &EventHandler) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Arc::as_ptr(&self.0))
    }
}

type RenderFn = dyn Fn(&Props) -> anyhow::Result<VNode> + Send + Sync;

/// A function component: props in, tree out.
///
/// Identity is the render function allocation. Clone the `Component` to reuse
/// it; two `Component::new` calls with the same closure body are different
/// components.
#[derive(Clone)]
pub struct Component {
    name: Arc<str>,
    render: Arc<RenderFn>,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        render: impl Fn(&Props) -> anyhow::Result<VNode> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: Arc::from(name.into()),
            render: Arc::new(render),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn same(&self, other: &Component) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.render), Arc::as_ptr(&other.render))
    }

    /// Run the render function. Callers are expected to guard against panics.
    pub(crate) fn render(&self, props: &Props) -> anyhow::Result<VNode> {
        (self.render)(props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

// =============================================================================
// Props
// =============================================================================

/// A prop value after construction.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Entity-escaped string.
    Text(SafeText),
    Number(f64),
    Bool(bool),
    Handler(EventHandler),
    /// Style declarations keyed by property, values entity-escaped.
    Style(BTreeMap<String, SafeText>),
}

/// Stored props of a node: named values plus the flattened children.
#[derive(Clone)]
pub struct Props {
    entries: BTreeMap<String, PropValue>,
    children: Arc<[VNode]>,
}

impl Props {
    fn new(entries: BTreeMap<String, PropValue>, children: Vec<VNode>) -> Self {
        Self {
            entries,
            children: Arc::from(children),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    /// The escaped string value of `name`, if it is a text prop.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.entries.get(name) {
            Some(PropValue::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.entries.get(name) {
            Some(PropValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Props in name order. Children are not included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn children(&self) -> &[VNode] {
        &self.children
    }
}

impl PartialEq for Props {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries && *self.children == *other.children
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("entries", &self.entries)
            .field("children", &self.children.len())
            .finish()
    }
}

// =============================================================================
// Construction input
// =============================================================================

/// A raw attribute value handed to the factory.
#[derive(Debug, Clone)]
pub enum AttrValue {
    Str(String),
    Number(f64),
    Bool(bool),
    Handler(EventHandler),
    /// Only meaningful on the `style` prop.
    Style(BTreeMap<String, String>),
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<&String> for AttrValue {
    fn from(s: &String) -> Self {
        AttrValue::Str(s.clone())
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<EventHandler> for AttrValue {
    fn from(h: EventHandler) -> Self {
        AttrValue::Handler(h)
    }
}

impl From<BTreeMap<String, String>> for AttrValue {
    fn from(declarations: BTreeMap<String, String>) -> Self {
        AttrValue::Style(declarations)
    }
}

impl<'a, const N: usize> From<[(&'a str, &'a str); N]> for AttrValue {
    fn from(declarations: [(&'a str, &'a str); N]) -> Self {
        AttrValue::Style(
            declarations
                .into_iter()
                .map(|(p, v)| (p.to_string(), v.to_string()))
                .collect(),
        )
    }
}

macro_rules! attr_from_number {
    ($($t:ty),*) => {
        $(impl From<$t> for AttrValue {
            fn from(n: $t) -> Self {
                AttrValue::Number(n as f64)
            }
        })*
    };
}

attr_from_number!(f32, f64, i32, i64, u32, u64, usize);

/// Ordered raw attributes. A later entry for the same name wins.
#[derive(Debug, Clone, Default)]
pub struct Attrs(Vec<(String, AttrValue)>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<AttrValue>> FromIterator<(N, V)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Attrs(
            iter.into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }
}

/// A child handed to the factory before flattening.
#[derive(Debug, Clone)]
pub enum Child {
    Node(VNode),
    Text(String),
    List(Vec<Child>),
    Empty,
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Node(node)
    }
}

impl From<&VNode> for Child {
    fn from(node: &VNode) -> Self {
        Child::Node(node.clone())
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Text(s.to_string())
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Text(s)
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Child::Empty, Into::into)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(items: Vec<T>) -> Self {
        Child::List(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! child_from_number {
    ($($t:ty),*) => {
        $(impl From<$t> for Child {
            fn from(n: $t) -> Self {
                Child::Text(n.to_string())
            }
        })*
    };
}

child_from_number!(i32, i64, u32, u64, usize, f64);

// =============================================================================
// VNode
// =============================================================================

/// What a node renders as.
#[derive(Debug, Clone)]
pub enum Kind {
    Tag(Arc<str>),
    Component(Component),
    Text,
}

impl Kind {
    /// Same tag name, same component identity, or both text.
    pub fn same_as(&self, other: &Kind) -> bool {
        match (self, other) {
            (Kind::Tag(a), Kind::Tag(b)) => a == b,
            (Kind::Component(a), Kind::Component(b)) => a.same(b),
            (Kind::Text, Kind::Text) => true,
            _ => false,
        }
    }
}

impl From<&str> for Kind {
    fn from(tag: &str) -> Self {
        Kind::Tag(Arc::from(tag))
    }
}

impl From<String> for Kind {
    fn from(tag: String) -> Self {
        Kind::Tag(Arc::from(tag))
    }
}

impl From<Component> for Kind {
    fn from(component: Component) -> Self {
        Kind::Component(component)
    }
}

impl From<&Component> for Kind {
    fn from(component: &Component) -> Self {
        Kind::Component(component.clone())
    }
}

struct Inner {
    kind: Kind,
    props: Props,
    key: Option<Key>,
    /// Raw (unescaped) content of a text node.
    content: Option<Arc<str>>,
}

/// An immutable virtual node.
#[derive(Clone)]
pub struct VNode(Arc<Inner>);

impl VNode {
    pub fn kind(&self) -> &Kind {
        &self.0.kind
    }

    pub fn props(&self) -> &Props {
        &self.0.props
    }

    pub fn key(&self) -> Option<&Key> {
        self.0.key.as_ref()
    }

    pub fn children(&self) -> &[VNode] {
        self.0.props.children()
    }

    /// Tag name for element nodes.
    pub fn tag(&self) -> Option<&str> {
        match &self.0.kind {
            Kind::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    /// Raw content for text nodes.
    pub fn text(&self) -> Option<&str> {
        self.0.content.as_deref()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.kind, Kind::Text)
    }

    pub fn component(&self) -> Option<&Component> {
        match &self.0.kind {
            Kind::Component(c) => Some(c),
            _ => None,
        }
    }

    /// True if both handles point at the same node.
    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Depth-first pre-order traversal. Components are not resolved.
    pub fn walk(&self, visit: &mut impl FnMut(&VNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// First node in pre-order that satisfies `pred`.
    pub fn find(&self, pred: &impl Fn(&VNode) -> bool) -> Option<&VNode> {
        if pred(self) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(pred))
    }

    /// Nodes in this subtree, this node included.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(VNode::node_count).sum::<usize>()
    }
}

impl PartialEq for VNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.0.kind.same_as(&other.0.kind)
                && self.0.key == other.0.key
                && self.0.content == other.0.content
                && self.0.props == other.0.props)
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            Kind::Text => write!(f, "Text({:?})", self.text().unwrap_or("")),
            kind => {
                let mut s = f.debug_struct("VNode");
                s.field("kind", kind);
                if let Some(key) = &self.0.key {
                    s.field("key", key);
                }
                s.field("props", &self.0.props);
                s.field("children", &self.children());
                s.finish()
            }
        }
    }
}

// =============================================================================
// Factory
// =============================================================================

/// A text node. Content is stored raw and escaped when written to a document.
pub fn text(content: impl Into<String>) -> VNode {
    VNode(Arc::new(Inner {
        kind: Kind::Text,
        props: Props::new(BTreeMap::new(), Vec::new()),
        key: None,
        content: Some(Arc::from(content.into())),
    }))
}

/// Build a node from a kind, raw attributes and children.
///
/// - nested child lists are flattened, empty children dropped, strings
///   become text nodes
/// - prop names that cannot be serialized as attributes are rejected
/// - string values on `on*` props are dropped
/// - other string values are entity-escaped
/// - style maps are only accepted on `style`, with checked property names
/// - `key` is lifted out of the props
pub fn create(
    kind: impl Into<Kind>,
    attrs: Attrs,
    children: impl IntoIterator<Item = Child>,
) -> Result<VNode, VNodeError> {
    let kind = kind.into();
    validate_kind(&kind)?;

    let mut entries = BTreeMap::new();
    let mut key = None;

    for (name, value) in attrs.0 {
        if name.is_empty() {
            return Err(VNodeError::MalformedProp {
                name,
                reason: "prop name is empty",
            });
        }
        if check_attribute_name(&name).is_err() {
            return Err(VNodeError::MalformedProp {
                name,
                reason: "prop name contains characters not allowed in attribute names",
            });
        }
        if name == "key" {
            key = match value {
                AttrValue::Str(s) => Some(Key::from(s)),
                AttrValue::Number(n) => Some(Key::from(format_number(n))),
                _ => {
                    return Err(VNodeError::MalformedProp {
                        name,
                        reason: "key must be a string or number",
                    })
                }
            };
            continue;
        }
        let value = match value {
            AttrValue::Str(_) if is_event_prop(&name) => {
                debug!(prop = %name, "dropping string value on event prop");
                continue;
            }
            AttrValue::Str(s) => PropValue::Text(SafeText::escape(&s)),
            AttrValue::Number(n) => PropValue::Number(n),
            AttrValue::Bool(b) => PropValue::Bool(b),
            AttrValue::Handler(h) if is_event_prop(&name) => PropValue::Handler(h),
            AttrValue::Handler(_) => {
                return Err(VNodeError::MalformedProp {
                    name,
                    reason: "handlers are only allowed on on* props",
                })
            }
            AttrValue::Style(declarations) if name == "style" => {
                PropValue::Style(style_map(&name, declarations)?)
            }
            AttrValue::Style(_) => {
                return Err(VNodeError::MalformedProp {
                    name,
                    reason: "style maps are only allowed on the style prop",
                })
            }
        };
        entries.insert(name, value);
    }

    let mut flat = Vec::new();
    for child in children {
        flatten(child, &mut flat);
    }

    Ok(VNode(Arc::new(Inner {
        kind,
        props: Props::new(entries, flat),
        key,
        content: None,
    })))
}

fn style_map(
    name: &str,
    declarations: BTreeMap<String, String>,
) -> Result<BTreeMap<String, SafeText>, VNodeError> {
    let mut out = BTreeMap::new();
    for (property, value) in declarations {
        if check_style_property(&property).is_err() {
            return Err(VNodeError::MalformedProp {
                name: format!("{name}.{property}"),
                reason: "not a valid style property name",
            });
        }
        let value = SafeText::escape(&value);
        if split_declarations(value.as_str()).len() > 1 {
            return Err(VNodeError::MalformedProp {
                name: format!("{name}.{property}"),
                reason: "style value holds more than one declaration",
            });
        }
        out.insert(property, value);
    }
    Ok(out)
}

fn validate_kind(kind: &Kind) -> Result<(), VNodeError> {
    match kind {
        Kind::Component(_) => Ok(()),
        Kind::Text => Err(VNodeError::InvalidKind {
            kind: "#text".into(),
            reason: "text nodes are built with text()",
        }),
        Kind::Tag(tag) => {
            let mut chars = tag.chars();
            match chars.next() {
                None => Err(VNodeError::InvalidKind {
                    kind: tag.to_string(),
                    reason: "tag name is empty",
                }),
                Some(c) if !c.is_ascii_alphabetic() => Err(VNodeError::InvalidKind {
                    kind: tag.to_string(),
                    reason: "tag name must start with a letter",
                }),
                Some(_) => {
                    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')) {
                        Ok(())
                    } else {
                        Err(VNodeError::InvalidKind {
                            kind: tag.to_string(),
                            reason: "tag name contains invalid characters",
                        })
                    }
                }
            }
        }
    }
}

fn flatten(child: Child, out: &mut Vec<VNode>) {
    match child {
        Child::Node(node) => out.push(node),
        Child::Text(s) => out.push(text(s)),
        Child::List(items) => {
            for item in items {
                flatten(item, out);
            }
        }
        Child::Empty => {}
    }
}

/// Render a number the way a document attribute expects: integers without a
/// fractional part.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Start building an element (or component) node.
pub fn element(kind: impl Into<Kind>) -> ElementBuilder {
    ElementBuilder {
        kind: kind.into(),
        attrs: Attrs::new(),
        children: Vec::new(),
    }
}

/// Fluent front-end to [`create`].
#[derive(Debug)]
pub struct ElementBuilder {
    kind: Kind,
    attrs: Attrs,
    children: Vec<Child>,
}

impl ElementBuilder {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs = self.attrs.with(name, value);
        self
    }

    /// Attach a handler under `on{event}` (`on("click", ..)` sets `onclick`).
    pub fn on(self, event: &str, handler: impl Fn(&DomEvent) + Send + Sync + 'static) -> Self {
        self.attr(format!("on{event}"), EventHandler::new(handler))
    }

    pub fn key(self, key: impl Into<Key>) -> Self {
        let key: Key = key.into();
        self.attr("key", key.as_str())
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<C: Into<Child>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<VNode, VNodeError> {
        create(self.kind, self.attrs, self.children)
    }
}
