//! Mounting: keep a container in sync with successive trees.
//!
//! A [`Renderer`] owns the last rendered tree for one container. The first
//! render materializes; later renders diff against the previous tree and
//! apply the patch. Renders are serialized by `&mut self`.

use tracing::{debug, info};

use crate::apply::apply;
use crate::diff::diff_optional;
use crate::dom::{Host, NodeId};
use crate::error::{ApplyReport, RenderError};
use crate::vnode::VNode;

/// Association between a container and the live root rendered into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountedTree {
    pub container: NodeId,
    pub root: Option<NodeId>,
}

/// What one call to [`Renderer::render`] did.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// Number of ops in the applied patch.
    pub ops: usize,
    pub report: ApplyReport,
}

#[derive(Debug)]
pub struct Renderer {
    mount: MountedTree,
    current: Option<VNode>,
    renders: u64,
}

impl Renderer {
    pub fn new(container: NodeId) -> Self {
        Self {
            mount: MountedTree {
                container,
                root: None,
            },
            current: None,
            renders: 0,
        }
    }

    pub fn mounted(&self) -> MountedTree {
        self.mount
    }

    pub fn current(&self) -> Option<&VNode> {
        self.current.as_ref()
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Bring the container in line with `tree` (`None` unmounts).
    ///
    /// On the first render the container's existing children are released.
    pub fn render<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        tree: Option<VNode>,
    ) -> Result<RenderOutcome, RenderError> {
        let container = self.mount.container;
        if !host.is_element(container) {
            return Err(RenderError::InvalidContainer(container));
        }

        if self.renders == 0 {
            while let Some(child) = host.child_at(container, 0) {
                host.remove_child(container, child)?;
                host.release(child);
            }
        }

        let patch = diff_optional(self.current.as_ref(), tree.as_ref());
        let report = apply(host, &patch, container)?;

        self.mount.root = host.child_at(container, 0);
        self.current = tree;
        self.renders += 1;

        if self.renders == 1 {
            info!(container = %container, "mounted tree");
        } else {
            debug!(container = %container, ops = patch.len(), %report, "re-rendered");
        }

        Ok(RenderOutcome {
            ops: patch.len(),
            report,
        })
    }

    /// Remove the mounted tree, leaving the container empty.
    pub fn unmount<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Result<RenderOutcome, RenderError> {
        self.render(host, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::vnode::element;

    fn container(doc: &mut Document) -> NodeId {
        let c = doc.create_element("main").unwrap();
        doc.append_child(doc.body(), c).unwrap();
        c
    }

    #[test]
    fn test_first_render_mounts_and_clears_container() {
        let mut doc = Document::new();
        let c = container(&mut doc);
        let stale = doc.create_text("loading...").unwrap();
        doc.append_child(c, stale).unwrap();

        let mut renderer = Renderer::new(c);
        renderer
            .render(&mut doc, Some(element("h1").child("hi").build().unwrap()))
            .unwrap();

        assert_eq!(doc.inner_html(c), "<h1>hi</h1>");
        assert!(!doc.exists(stale));
        assert_eq!(renderer.mounted().root, doc.child_at(c, 0));
    }

    #[test]
    fn test_rerender_patches_in_place() {
        let mut doc = Document::new();
        let c = container(&mut doc);
        let mut renderer = Renderer::new(c);

        renderer
            .render(&mut doc, Some(element("p").child("one").build().unwrap()))
            .unwrap();
        let root = renderer.mounted().root;
        let outcome = renderer
            .render(&mut doc, Some(element("p").child("two").build().unwrap()))
            .unwrap();

        assert_eq!(outcome.ops, 1);
        assert!(outcome.report.is_complete());
        assert_eq!(renderer.mounted().root, root);
        assert_eq!(doc.inner_html(c), "<p>two</p>");
    }

    #[test]
    fn test_root_replacement_rebinds() {
        let mut doc = Document::new();
        let c = container(&mut doc);
        let mut renderer = Renderer::new(c);

        renderer.render(&mut doc, Some(element("p").build().unwrap())).unwrap();
        let first = renderer.mounted().root;
        renderer.render(&mut doc, Some(element("div").build().unwrap())).unwrap();

        assert_ne!(renderer.mounted().root, first);
        assert_eq!(renderer.mounted().root, doc.child_at(c, 0));
        assert_eq!(doc.inner_html(c), "<div></div>");
    }

    #[test]
    fn test_unmount() {
        let mut doc = Document::new();
        let c = container(&mut doc);
        let mut renderer = Renderer::new(c);
        renderer.render(&mut doc, Some(element("p").build().unwrap())).unwrap();

        renderer.unmount(&mut doc).unwrap();

        assert_eq!(doc.child_count(c), 0);
        assert_eq!(renderer.mounted().root, None);
        assert!(renderer.current().is_none());
    }

    #[test]
    fn test_released_container_errors() {
        let mut doc = Document::new();
        let c = container(&mut doc);
        doc.release(c);
        let mut renderer = Renderer::new(c);
        assert_eq!(
            renderer.render(&mut doc, None).unwrap_err(),
            RenderError::InvalidContainer(c)
        );
    }
}
