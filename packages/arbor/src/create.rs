//! Materialization: turn a vnode tree into live host nodes.
//!
//! Every vnode becomes exactly one host node, so paths computed against the
//! virtual tree stay valid against the live one:
//!
//! - a text vnode becomes an escaped text node
//! - a component that fails becomes a `<div data-arbor-error="component">`
//!   placeholder holding the error text
//! - a child that cannot be materialized becomes a `[Child Error: ...]` text node
//!
//! A prop the host rejects is logged and skipped; the element is still created.

use tracing::{error, warn};

use crate::component::resolve;
use crate::dom::{Host, NodeId};
use crate::error::RenderError;
use crate::props::set_prop;
use crate::sanitize::escape_html;
use crate::vnode::{Kind, VNode};

/// Attribute marking a component error placeholder.
pub const ERROR_ATTRIBUTE: &str = "data-arbor-error";

/// Create the live subtree for `node`. The returned node is detached.
pub fn materialize<H: Host + ?Sized>(host: &mut H, node: &VNode) -> Result<NodeId, RenderError> {
    match node.kind() {
        Kind::Text => Ok(host.create_text(&escape_html(node.text().unwrap_or("")))?),
        Kind::Component(_) => match resolve(node) {
            Ok(resolved) => materialize(host, &resolved),
            Err(e) => placeholder(host, &e),
        },
        Kind::Tag(tag) => {
            let el = host.create_element(tag)?;

            for (name, value) in node.props().iter() {
                if let Err(e) = set_prop(host, el, name, value) {
                    warn!(tag = %tag, prop = name, error = %e, "skipping prop the host rejected");
                }
            }

            for child in node.children() {
                let live = match materialize(host, child) {
                    Ok(live) => live,
                    Err(e) => {
                        error!(tag = %tag, error = %e, "child failed to materialize");
                        host.create_text(&escape_html(&format!("[Child Error: {e}]")))?
                    }
                };
                host.append_child(el, live)?;
            }

            Ok(el)
        }
    }
}

fn placeholder<H: Host + ?Sized>(host: &mut H, err: &RenderError) -> Result<NodeId, RenderError> {
    let message = match err {
        RenderError::ComponentFailed { message, .. } => message.clone(),
        other => other.to_string(),
    };
    let div = host.create_element("div")?;
    host.set_attribute(div, ERROR_ATTRIBUTE, "component")?;
    let text = host.create_text(&escape_html(&format!("[Component Error: {message}]")))?;
    host.append_child(div, text)?;
    Ok(div)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::vnode::{element, text, Component};

    #[test]
    fn test_materialize_element_tree() {
        let mut doc = Document::new();
        let tree = element("ul")
            .attr("className", "list")
            .child(element("li").attr("id", "a").child("one").build().unwrap())
            .child(element("li").child("two & three").build().unwrap())
            .build()
            .unwrap();

        let live = materialize(&mut doc, &tree).unwrap();

        assert_eq!(
            doc.to_html(live),
            r#"<ul class="list"><li id="a">one</li><li>two &amp; three</li></ul>"#
        );
        assert_eq!(doc.parent(live), None);
    }

    #[test]
    fn test_text_is_escaped() {
        let mut doc = Document::new();
        let live = materialize(&mut doc, &text("<script>")).unwrap();
        assert_eq!(doc.to_html(live), "&lt;script&gt;");
    }

    #[test]
    fn test_one_live_node_per_vnode() {
        let mut doc = Document::new();
        let before = doc.live_nodes();
        let tree = element("div")
            .child(element("span").child("a").build().unwrap())
            .child("b")
            .build()
            .unwrap();

        materialize(&mut doc, &tree).unwrap();

        assert_eq!(doc.live_nodes() - before, tree.node_count());
    }

    #[test]
    fn test_component_is_resolved() {
        let mut doc = Document::new();
        let badge = Component::new("Badge", |props| {
            element("span")
                .attr("className", "badge")
                .child(format!("{}", props.number("count").unwrap_or(0.0)))
                .build()
                .map_err(Into::into)
        });
        let tree = element(badge).attr("count", 3).build().unwrap();

        let live = materialize(&mut doc, &tree).unwrap();
        assert_eq!(doc.to_html(live), r#"<span class="badge">3</span>"#);
    }

    #[test]
    fn test_failing_component_becomes_placeholder() {
        let mut doc = Document::new();
        let broken = Component::new("Broken", |_| Err(anyhow::anyhow!("offline")));
        let tree = element("section")
            .child(element(broken).build().unwrap())
            .child("after")
            .build()
            .unwrap();

        let live = materialize(&mut doc, &tree).unwrap();

        assert_eq!(
            doc.to_html(live),
            concat!(
                r#"<section><div data-arbor-error="component">"#,
                "[Component Error: offline]</div>after</section>"
            )
        );
    }

    #[test]
    fn test_panicking_component_is_contained() {
        let mut doc = Document::new();
        let panicky = Component::new("Panicky", |_| panic!("kaboom"));
        let tree = element("div").child(element(panicky).build().unwrap()).build().unwrap();

        let live = materialize(&mut doc, &tree).unwrap();
        assert!(doc.text_content(live).unwrap().contains("[Component Error: kaboom]"));
    }
}
