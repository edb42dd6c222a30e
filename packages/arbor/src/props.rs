//! Property setter: maps a vnode prop onto host attributes and handler slots.
//!
//! | prop                     | effect on the element                     |
//! |--------------------------|-------------------------------------------|
//! | `on*` with a handler     | handler slot for the lower-cased event    |
//! | `className`              | `class` attribute                         |
//! | `style` (string)         | `style` attribute                         |
//! | `style` (map)            | one declaration per entry                 |
//! | bool `true` / `false`    | valueless attribute / attribute removed   |
//! | number                   | stringified attribute                     |
//! | `key`, `ref`             | ignored                                   |
//! | anything else            | escaped attribute                         |

use crate::dom::{Host, NodeId};
use crate::error::HostError;
use crate::sanitize::{is_event_prop, SafeText};
use crate::vnode::{format_number, PropValue};

const IGNORED: &[&str] = &["key", "ref"];

/// `onClick` -> `click`.
pub fn event_name(prop: &str) -> String {
    prop.get(2..).unwrap_or_default().to_ascii_lowercase()
}

fn attribute_name(prop: &str) -> &str {
    if prop == "className" {
        "class"
    } else {
        prop
    }
}

/// Apply one prop to an element.
pub fn set_prop<H: Host + ?Sized>(
    host: &mut H,
    node: NodeId,
    name: &str,
    value: &PropValue,
) -> Result<(), HostError> {
    if IGNORED.contains(&name) {
        return Ok(());
    }

    if is_event_prop(name) {
        // Non-handler values on event props never reach the document, but
        // they still clear whatever handler the slot held before.
        let handler = match value {
            PropValue::Handler(handler) => Some(handler.clone()),
            _ => None,
        };
        return host.set_event_handler(node, &event_name(name), handler);
    }

    let attr = attribute_name(name);
    match value {
        PropValue::Text(text) => host.set_attribute(node, attr, text.as_str()),
        PropValue::Number(n) => host.set_attribute(node, attr, &format_number(*n)),
        PropValue::Bool(true) => host.set_attribute(node, attr, ""),
        PropValue::Bool(false) => host.remove_attribute(node, attr),
        PropValue::Handler(_) => Ok(()),
        PropValue::Style(declarations) => {
            host.remove_attribute(node, attr)?;
            for (property, value) in declarations {
                host.set_style_property(node, property, value.as_str())?;
            }
            Ok(())
        }
    }
}

/// Apply a declaration-level style update.
///
/// Every declaration is attempted; the first failure is returned.
pub fn update_style<H: Host + ?Sized>(
    host: &mut H,
    node: NodeId,
    set: &[(String, SafeText)],
    removed: &[String],
) -> Result<(), HostError> {
    let mut first_error = None;
    for property in removed {
        if let Err(e) = host.remove_style_property(node, property) {
            first_error.get_or_insert(e);
        }
    }
    for (property, value) in set {
        if let Err(e) = host.set_style_property(node, property, value.as_str()) {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Undo a prop previously applied with [`set_prop`].
pub fn remove_prop<H: Host + ?Sized>(
    host: &mut H,
    node: NodeId,
    name: &str,
) -> Result<(), HostError> {
    if IGNORED.contains(&name) {
        return Ok(());
    }
    if is_event_prop(name) {
        return host.set_event_handler(node, &event_name(name), None);
    }
    host.remove_attribute(node, attribute_name(name))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::dom::Document;
    use crate::sanitize::SafeText;
    use crate::vnode::EventHandler;

    fn setup() -> (Document, NodeId) {
        let mut doc = Document::new();
        let node = doc.create_element("button").unwrap();
        (doc, node)
    }

    #[test]
    fn test_event_name() {
        assert_eq!(event_name("onClick"), "click");
        assert_eq!(event_name("onmouseover"), "mouseover");
        assert_eq!(event_name("ONCLICK"), "click");
        assert_eq!(event_name("o"), "");
    }

    #[test]
    fn test_class_name_maps_to_class() {
        let (mut doc, node) = setup();
        set_prop(&mut doc, node, "className", &PropValue::Text(SafeText::escape("btn"))).unwrap();
        assert_eq!(doc.attribute(node, "class").unwrap().as_deref(), Some("btn"));

        remove_prop(&mut doc, node, "className").unwrap();
        assert_eq!(doc.attribute(node, "class").unwrap(), None);
    }

    #[test]
    fn test_booleans_and_numbers() {
        let (mut doc, node) = setup();
        set_prop(&mut doc, node, "disabled", &PropValue::Bool(true)).unwrap();
        set_prop(&mut doc, node, "tabindex", &PropValue::Number(3.0)).unwrap();
        assert_eq!(doc.to_html(node), r#"<button disabled tabindex="3"></button>"#);

        set_prop(&mut doc, node, "disabled", &PropValue::Bool(false)).unwrap();
        assert_eq!(doc.attribute(node, "disabled").unwrap(), None);
    }

    #[test]
    fn test_style_string() {
        let (mut doc, node) = setup();
        let style = PropValue::Text(SafeText::escape("color: red"));
        set_prop(&mut doc, node, "style", &style).unwrap();
        assert_eq!(doc.attribute(node, "style").unwrap().as_deref(), Some("color: red"));
    }

    #[test]
    fn test_key_and_ref_ignored() {
        let (mut doc, node) = setup();
        set_prop(&mut doc, node, "key", &PropValue::Text(SafeText::escape("k"))).unwrap();
        set_prop(&mut doc, node, "ref", &PropValue::Text(SafeText::escape("r"))).unwrap();
        assert_eq!(doc.to_html(node), "<button></button>");
    }

    #[test]
    fn test_handlers_go_to_the_slot() {
        let (mut doc, node) = setup();
        let clicked = Arc::new(AtomicBool::new(false));
        let flag = clicked.clone();
        let handler = EventHandler::new(move |_| flag.store(true, Ordering::SeqCst));

        set_prop(&mut doc, node, "onClick", &PropValue::Handler(handler)).unwrap();
        assert_eq!(doc.dispatch_event(node, "click", serde_json::Value::Null), 1);
        assert!(clicked.load(Ordering::SeqCst));

        remove_prop(&mut doc, node, "onClick").unwrap();
        assert_eq!(doc.dispatch_event(node, "click", serde_json::Value::Null), 0);
        assert_eq!(doc.to_html(node), "<button></button>");
    }

    #[test]
    fn test_non_handler_value_clears_the_slot() {
        let (mut doc, node) = setup();
        let handler = EventHandler::new(|_| {});
        set_prop(&mut doc, node, "onclick", &PropValue::Handler(handler)).unwrap();

        set_prop(&mut doc, node, "onclick", &PropValue::Bool(true)).unwrap();

        assert_eq!(doc.dispatch_event(node, "click", serde_json::Value::Null), 0);
        assert_eq!(doc.to_html(node), "<button></button>");
    }

    #[test]
    fn test_style_map_and_declaration_updates() {
        let (mut doc, node) = setup();
        doc.set_attribute(node, "style", "display: none").unwrap();
        let map = [("color", "red"), ("margin", "0")]
            .into_iter()
            .map(|(p, v)| (p.to_string(), SafeText::escape(v)))
            .collect();

        set_prop(&mut doc, node, "style", &PropValue::Style(map)).unwrap();
        assert_eq!(doc.attribute(node, "style").unwrap().as_deref(), Some("color: red; margin: 0"));

        update_style(
            &mut doc,
            node,
            &[("color".into(), SafeText::escape("blue")), ("top".into(), SafeText::escape("1px"))],
            &["margin".into()],
        )
        .unwrap();
        assert_eq!(doc.attribute(node, "style").unwrap().as_deref(), Some("color: blue; top: 1px"));

        let err = update_style(&mut doc, node, &[("bad name".into(), SafeText::escape("x"))], &[])
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidStyle { .. }));
    }

    #[test]
    fn test_text_nodes_rejected() {
        let mut doc = Document::new();
        let text = doc.create_text("x").unwrap();
        assert_eq!(
            set_prop(&mut doc, text, "id", &PropValue::Text(SafeText::escape("a"))),
            Err(HostError::NotAnElement(text))
        );
    }
}
