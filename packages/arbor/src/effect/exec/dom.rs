use crate::dom::{Document, Host, NodeId, ReadyState};
use crate::effect::dom::DomOp;
use crate::effect::{Category, Completion, EffectResult, EffectValue};
use crate::error::{EffectError, HostError};
use crate::sanitize::escape_html;

fn rejected(operation: &'static str) -> impl FnOnce(HostError) -> EffectError {
    move |e| EffectError::invalid(operation, e)
}

fn element(doc: &Document, operation: &'static str, node: NodeId) -> Result<NodeId, EffectError> {
    if doc.is_element(node) {
        Ok(node)
    } else if doc.exists(node) {
        Err(EffectError::invalid(operation, HostError::NotAnElement(node)))
    } else {
        Err(EffectError::invalid(operation, HostError::NoSuchNode(node)))
    }
}

pub(crate) fn execute(doc: &mut Document, op: DomOp) -> Completion {
    if let DomOp::DomReady = op {
        return dom_ready(doc);
    }
    Completion::Ready(execute_sync(doc, op))
}

fn dom_ready(doc: &Document) -> Completion {
    if doc.ready_state() != ReadyState::Loading {
        return Completion::Ready(Ok(EffectValue::Unit));
    }
    let ready = doc.ready_signal();
    Completion::pending("domReady", async move {
        if ready.await {
            Ok(EffectValue::Unit)
        } else {
            Err(EffectError::Unsupported(
                "document was dropped before it became ready".into(),
            ))
        }
    })
}

fn execute_sync(doc: &mut Document, op: DomOp) -> EffectResult {
    match op {
        DomOp::Query { selector } => doc
            .query_selector(&selector)
            .map(EffectValue::MaybeNode)
            .map_err(rejected("query")),
        DomOp::QueryAll { selector } => doc
            .query_selector_all(&selector)
            .map(EffectValue::Nodes)
            .map_err(rejected("queryAll")),
        DomOp::GetElementById { id } => Ok(EffectValue::MaybeNode(doc.element_by_id(&id))),
        DomOp::SetTextContent { element: node, text } => {
            let node = element(doc, "setTextContent", node)?;
            doc.replace_children_with_text(node, &escape_html(&text))
                .map_err(rejected("setTextContent"))?;
            Ok(EffectValue::Node(node))
        }
        DomOp::SetHtml { element: node, html } => {
            let node = element(doc, "setHTML", node)?;
            doc.replace_children_with_text(node, &escape_html(&html))
                .map_err(rejected("setHTML"))?;
            Ok(EffectValue::Node(node))
        }
        DomOp::SetAttribute {
            element: node,
            name,
            value,
        } => {
            let node = element(doc, "setAttribute", node)?;
            doc.set_attribute(node, &name, &escape_html(&value))
                .map_err(rejected("setAttribute"))?;
            Ok(EffectValue::Node(node))
        }
        DomOp::RemoveAttribute { element: node, name } => {
            let node = element(doc, "removeAttribute", node)?;
            doc.remove_attribute(node, &name)
                .map_err(rejected("removeAttribute"))?;
            Ok(EffectValue::Node(node))
        }
        DomOp::AddClass {
            element: node,
            class_name,
        } => {
            let node = element(doc, "addClass", node)?;
            doc.add_class(node, &class_name).map_err(rejected("addClass"))?;
            Ok(EffectValue::Node(node))
        }
        DomOp::RemoveClass {
            element: node,
            class_name,
        } => {
            let node = element(doc, "removeClass", node)?;
            doc.remove_class(node, &class_name)
                .map_err(rejected("removeClass"))?;
            Ok(EffectValue::Node(node))
        }
        DomOp::HasClass {
            element: node,
            class_name,
        } => {
            let node = element(doc, "hasClass", node)?;
            doc.has_class(node, &class_name)
                .map(EffectValue::Bool)
                .map_err(rejected("hasClass"))
        }
        DomOp::SetStyle {
            element: node,
            property,
            value,
        } => {
            let node = element(doc, "setStyle", node)?;
            doc.set_style_property(node, &property, &escape_html(&value))
                .map_err(rejected("setStyle"))?;
            Ok(EffectValue::Node(node))
        }
        DomOp::AddEventListener {
            element: node,
            event,
            handler,
        } => {
            let node = element(doc, "addEventListener", node)?;
            doc.add_event_listener(node, &event, handler)
                .map(EffectValue::Listener)
                .map_err(rejected("addEventListener"))
        }
        DomOp::RemoveEventListener {
            element: node,
            listener,
        } => {
            let node = element(doc, "removeEventListener", node)?;
            doc.remove_event_listener(node, listener)
                .map(EffectValue::Bool)
                .map_err(rejected("removeEventListener"))
        }
        DomOp::CreateElement { tag_name } => doc
            .create_element(&tag_name)
            .map(EffectValue::Node)
            .map_err(rejected("createElement")),
        DomOp::AppendChild { parent, child } => {
            let parent = element(doc, "appendChild", parent)?;
            doc.append_child(parent, child)
                .map_err(rejected("appendChild"))?;
            Ok(EffectValue::Node(parent))
        }
        DomOp::RemoveChild { parent, child } => {
            let parent = element(doc, "removeChild", parent)?;
            doc.remove_child(parent, child)
                .map_err(rejected("removeChild"))?;
            Ok(EffectValue::Node(parent))
        }
        DomOp::Focus { element: node } => {
            let node = element(doc, "focus", node)?;
            doc.focus(node).map_err(rejected("focus"))?;
            Ok(EffectValue::Node(node))
        }
        DomOp::ScrollTo {
            element: node,
            options,
        } => {
            let node = element(doc, "scrollTo", node)?;
            doc.scroll_into_view(node, options)
                .map_err(rejected("scrollTo"))?;
            Ok(EffectValue::Node(node))
        }
        DomOp::DomReady => Ok(EffectValue::Unit),
        DomOp::Unknown { operation, .. } => Err(super::unknown(Category::Dom, operation)),
    }
}
