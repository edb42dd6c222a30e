//! Reconciler properties checked over generated trees.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arbor::{
    apply, diff, element, materialize, text, ChildOp, Component, Document, Host, NodeId, PatchOp,
    Renderer, VNode, VNodeError,
};

// =============================================================================
// Tree generator
// =============================================================================

const TAGS: [&str; 5] = ["div", "ul", "li", "span", "p"];
const KEYS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

struct TreeGen {
    rng: fastrand::Rng,
    badge: Component,
}

impl TreeGen {
    fn new(seed: u64, badge: &Component) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            badge: badge.clone(),
        }
    }

    fn root(&mut self) -> VNode {
        self.element(0)
    }

    fn node(&mut self, depth: u32) -> VNode {
        match self.rng.u8(0..10) {
            0 | 1 => text(format!("t{}", self.rng.u8(0..4))),
            2 => element(&self.badge)
                .attr("label", format!("b{}", self.rng.u8(0..3)))
                .build()
                .unwrap(),
            _ => self.element(depth),
        }
    }

    fn element(&mut self, depth: u32) -> VNode {
        let tag = TAGS[self.rng.usize(..TAGS.len())];
        let mut builder = element(tag);
        for name in ["title", "className", "data-x"] {
            if self.rng.bool() {
                builder = builder.attr(name, format!("v{}&{}", self.rng.u8(0..3), name));
            }
        }
        if self.rng.u8(0..4) == 0 {
            builder = builder.attr("hidden", self.rng.bool());
        }

        if depth < 3 {
            let count = self.rng.usize(0..5);
            match self.rng.u8(0..3) {
                0 => {
                    let mut keys = KEYS;
                    self.rng.shuffle(&mut keys);
                    for key in &keys[..count] {
                        builder = builder.child(self.keyed(key, depth));
                    }
                }
                1 => {
                    // Keyed and unkeyed siblings, keys drawn with repetition.
                    for _ in 0..count {
                        let child = if self.rng.bool() {
                            let key = KEYS[self.rng.usize(..3)];
                            self.keyed(key, depth)
                        } else {
                            self.node(depth + 1)
                        };
                        builder = builder.child(child);
                    }
                }
                _ => {
                    for _ in 0..count {
                        builder = builder.child(self.node(depth + 1));
                    }
                }
            }
        }
        builder.build().unwrap()
    }

    fn keyed(&mut self, key: &str, depth: u32) -> VNode {
        let inner = self.node(depth + 1);
        element("li").key(key).child(inner).build().unwrap()
    }
}

fn badge() -> Component {
    Component::new("Badge", |props| {
        let label = props.text("label").unwrap_or("none").to_string();
        Ok(element("em").child(label).build()?)
    })
}

fn mount(doc: &mut Document, tree: &VNode) -> NodeId {
    let container = doc.create_element("main").unwrap();
    doc.append_child(doc.body(), container).unwrap();
    let root = materialize(doc, tree).unwrap();
    doc.append_child(container, root).unwrap();
    container
}

fn fresh_html(tree: &VNode) -> String {
    let mut doc = Document::new();
    let container = mount(&mut doc, tree);
    doc.inner_html(container)
}

fn keyed_list(keys: &[&str]) -> VNode {
    element("ul")
        .children(keys.iter().map(|k| element("li").key(*k).child(*k).build().unwrap()))
        .build()
        .unwrap()
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn diff_of_equal_trees_is_empty() {
    let badge = badge();
    for seed in 0..200 {
        let a = TreeGen::new(seed, &badge).root();
        let b = TreeGen::new(seed, &badge).root();
        assert!(!a.ptr_eq(&b));
        let patch = diff(&a, &b);
        assert!(patch.is_empty(), "seed {seed}: expected empty patch, got {patch}");
    }
}

#[test]
fn diff_then_apply_matches_fresh_render() {
    let badge = badge();
    for seed in 0..300 {
        let old = TreeGen::new(seed, &badge).root();
        let new = TreeGen::new(seed + 10_000, &badge).root();

        let mut doc = Document::new();
        let container = mount(&mut doc, &old);
        let report = apply(&mut doc, &diff(&old, &new), container).unwrap();

        assert!(report.is_complete(), "seed {seed}: {report}");
        assert_eq!(doc.inner_html(container), fresh_html(&new), "seed {seed}");
    }
}

#[test]
fn successive_patches_stay_consistent() {
    let badge = badge();
    let mut doc = Document::new();
    let container = doc.body();
    let mut renderer = Renderer::new(container);

    for seed in 0..50 {
        let tree = TreeGen::new(seed * 7 + 1, &badge).root();
        let outcome = renderer.render(&mut doc, Some(tree.clone())).unwrap();
        assert!(outcome.report.is_complete(), "seed {seed}: {}", outcome.report);
        assert_eq!(doc.inner_html(container), fresh_html(&tree), "seed {seed}");
    }
}

#[test]
fn adjacent_swap_is_a_single_move() {
    let old = keyed_list(&["a", "b", "c"]);
    let new = keyed_list(&["b", "a", "c"]);

    let patch = diff(&old, &new);

    assert_eq!(patch.count_moves(), 1);
    assert_eq!(patch.count_inserts(), 0);
    assert_eq!(patch.count_removals(), 0);
    assert_eq!(patch.count_replacements(), 0);
    assert!(patch.ops().iter().any(|op| matches!(
        op,
        PatchOp::ReorderChildren { ops, .. } if ops.as_slice() == [ChildOp::Move { from: 1, to: 0 }]
    )));
}

#[test]
fn keyed_reorder_preserves_node_identity() {
    let mut doc = Document::new();
    let container = doc.body();
    let mut renderer = Renderer::new(container);

    renderer
        .render(&mut doc, Some(keyed_list(&["a", "b", "c", "d"])))
        .unwrap();
    let ul = renderer.mounted().root.unwrap();
    let before = doc.children(ul).to_vec();

    renderer
        .render(&mut doc, Some(keyed_list(&["d", "b", "a", "c"])))
        .unwrap();

    assert_eq!(renderer.mounted().root, Some(ul));
    assert_eq!(doc.children(ul), &[before[3], before[1], before[0], before[2]]);
    assert_eq!(doc.inner_html(container), "<ul><li>d</li><li>b</li><li>a</li><li>c</li></ul>");
}

// =============================================================================
// Sanitization and isolation
// =============================================================================

#[test]
fn string_event_props_never_reach_the_document() {
    let tree = element("button")
        .attr("onclick", "alert(1)")
        .attr("title", "<script>\"x\"</script>")
        .child("go")
        .build()
        .unwrap();

    let html = fresh_html(&tree);

    assert!(!html.contains("onclick"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn unserializable_prop_names_are_rejected() {
    let spaced = element("div").attr("x onclick", "alert(1)").build();
    let quoted = element("div").attr("title\"", "x").build();
    assert!(matches!(spaced, Err(VNodeError::MalformedProp { .. })), "{spaced:?}");
    assert!(matches!(quoted, Err(VNodeError::MalformedProp { .. })), "{quoted:?}");

    let tree = element("div")
        .attr("ONCLICK", "alert(2)")
        .attr("OnMouseOver", "alert(3)")
        .build()
        .unwrap();
    assert!(tree.props().is_empty());
    assert_eq!(fresh_html(&tree), "<div></div>");
}

#[test]
fn replacing_a_handler_with_a_plain_value_detaches_it() {
    let clicks = Arc::new(AtomicUsize::new(0));
    let counter = clicks.clone();
    let old = element("button")
        .on("click", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();
    let new = element("button").attr("onclick", true).build().unwrap();

    let mut doc = Document::new();
    let container = mount(&mut doc, &old);
    let report = apply(&mut doc, &diff(&old, &new), container).unwrap();
    let button = doc.child_at(container, 0).unwrap();
    doc.dispatch_event(button, "click", serde_json::Value::Null);

    assert!(report.is_complete(), "{report}");
    assert_eq!(clicks.load(Ordering::SeqCst), 0);
    assert_eq!(doc.inner_html(container), "<button></button>");
}

#[test]
fn style_maps_patch_declarations_in_place() {
    let styled = |declarations: &[(&str, &str)]| {
        let map = declarations
            .iter()
            .map(|(p, v)| (p.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>();
        element("div").attr("style", map).child("x").build().unwrap()
    };
    let old = styled(&[("color", "red"), ("margin", "0")]);
    let new = styled(&[("color", "blue"), ("padding", "1px")]);

    let mut doc = Document::new();
    let container = mount(&mut doc, &old);
    let div = doc.child_at(container, 0).unwrap();
    let report = apply(&mut doc, &diff(&old, &new), container).unwrap();

    assert!(report.is_complete(), "{report}");
    assert_eq!(doc.child_at(container, 0), Some(div));
    assert_eq!(
        doc.attribute(div, "style").unwrap().as_deref(),
        Some("color: blue; padding: 1px")
    );
    assert_eq!(fresh_html(&new), r#"<div style="color: blue; padding: 1px">x</div>"#);
}

#[test]
fn handler_props_fire_on_dispatch() {
    let clicks = Arc::new(AtomicUsize::new(0));
    let counter = clicks.clone();
    let tree = element("button")
        .on("click", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let mut doc = Document::new();
    let container = mount(&mut doc, &tree);
    let button = doc.child_at(container, 0).unwrap();
    doc.dispatch_event(button, "click", serde_json::Value::Null);

    assert_eq!(clicks.load(Ordering::SeqCst), 1);
    assert_eq!(doc.inner_html(container), "<button></button>");
}

#[test]
fn failing_component_renders_placeholder_and_siblings_survive() {
    let broken = Component::new("Broken", |_| anyhow::bail!("no data"));
    let panicky = Component::new("Panicky", |_| panic!("kaboom"));
    let tree = element("section")
        .child(element("h1").child("title").build().unwrap())
        .child(element(&broken).build().unwrap())
        .child(element(&panicky).build().unwrap())
        .child("footer")
        .build()
        .unwrap();

    let html = fresh_html(&tree);

    assert!(html.starts_with("<section><h1>title</h1>"));
    assert!(html.contains("[Component Error: no data]"));
    assert!(html.contains("[Component Error: kaboom]"));
    assert!(html.ends_with("footer</section>"));
}

#[test]
fn swap_scenario_end_to_end() {
    let item = Component::new("Item", |props| {
        Ok(element("li").child(props.text("name").unwrap_or("").to_string()).build()?)
    });
    let list = |names: &[&str]| {
        element("ul")
            .children(
                names
                    .iter()
                    .map(|n| element(&item).key(*n).attr("name", *n).build().unwrap()),
            )
            .build()
            .unwrap()
    };

    let mut doc = Document::new();
    let container = doc.body();
    let mut renderer = Renderer::new(container);
    renderer.render(&mut doc, Some(list(&["x", "y"]))).unwrap();
    let ul = renderer.mounted().root.unwrap();
    let before = doc.children(ul).to_vec();

    let outcome = renderer.render(&mut doc, Some(list(&["y", "x"]))).unwrap();

    assert_eq!(outcome.ops, 1);
    assert!(outcome.report.is_complete());
    assert_eq!(doc.children(ul), &[before[1], before[0]]);
    assert_eq!(doc.inner_html(container), "<ul><li>y</li><li>x</li></ul>");
}
