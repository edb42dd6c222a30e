//! Patch application.
//!
//! Every op path is resolved to a live node before the first mutation, so the
//! old-tree paths a diff produces stay meaningful while earlier ops reshape
//! the document. Application is best-effort: a failing op is logged, recorded
//! in the [`ApplyReport`], and the remaining ops still run.

use tracing::{debug, warn};

use crate::create::materialize;
use crate::dom::{Host, NodeId};
use crate::error::{ApplyReport, PatchFailure, RenderError};
use crate::patch::{ChildOp, NodePath, Patch, PatchOp, PropChange};
use crate::props::{remove_prop, set_prop, update_style};
use crate::sanitize::escape_html;
use crate::vnode::VNode;

/// Apply `patch` to the tree mounted under `container`.
///
/// Only an invalid container is an error; everything else ends up in the
/// report.
pub fn apply<H: Host + ?Sized>(
    host: &mut H,
    patch: &Patch,
    container: NodeId,
) -> Result<ApplyReport, RenderError> {
    if !host.is_element(container) {
        return Err(RenderError::InvalidContainer(container));
    }

    let targets: Vec<Option<NodeId>> = patch
        .ops()
        .iter()
        .map(|op| resolve_path(host, container, op.path()))
        .collect();

    let mut report = ApplyReport::default();
    for (index, (op, target)) in patch.ops().iter().zip(targets).enumerate() {
        let mut fail = |error: RenderError| {
            warn!(op = op.name(), path = %op.path(), error = %error, "patch op failed");
            report.failures.push(PatchFailure {
                op_index: index,
                op: op.name(),
                path: op.path().clone(),
                error,
            });
        };

        let Some(target) = target else {
            fail(RenderError::MissingNode {
                path: op.path().clone(),
            });
            continue;
        };

        let mut applied = 0;
        match op {
            PatchOp::UpdateProps { changes, .. } => {
                for change in changes {
                    let result = match change {
                        PropChange::Set { name, value } => set_prop(host, target, name, value),
                        PropChange::Remove { name } => remove_prop(host, target, name),
                        PropChange::Style { set, removed, .. } => {
                            update_style(host, target, set, removed)
                        }
                    };
                    match result {
                        Ok(()) => applied += 1,
                        Err(e) => fail(e.into()),
                    }
                }
            }
            PatchOp::SetText { text, .. } => match host.set_text(target, &escape_html(text)) {
                Ok(()) => applied += 1,
                Err(e) => fail(e.into()),
            },
            PatchOp::ReorderChildren { ops, .. } => {
                for child_op in ops {
                    match apply_child_op(host, target, op.path(), child_op) {
                        Ok(()) => applied += 1,
                        Err(e) => fail(e),
                    }
                }
            }
            PatchOp::ReplaceNode { node, .. } => match replace(host, container, target, node) {
                Ok(()) => applied += 1,
                Err(e) => fail(e),
            },
        }
        report.applied += applied;
    }

    debug!(
        applied = report.applied,
        failed = report.failures.len(),
        "patch applied"
    );
    Ok(report)
}

/// Walk child indices down from the container.
pub fn resolve_path<H: Host + ?Sized>(
    host: &H,
    container: NodeId,
    path: &NodePath,
) -> Option<NodeId> {
    path.indices()
        .iter()
        .try_fold(container, |node, index| host.child_at(node, *index))
}

fn apply_child_op<H: Host + ?Sized>(
    host: &mut H,
    parent: NodeId,
    path: &NodePath,
    op: &ChildOp,
) -> Result<(), RenderError> {
    let missing = |index: usize| RenderError::MissingNode {
        path: path.child(index),
    };
    match op {
        ChildOp::Remove { index } => {
            let child = host.child_at(parent, *index).ok_or_else(|| missing(*index))?;
            host.remove_child(parent, child)?;
            host.release(child);
        }
        ChildOp::Insert { index, node } => {
            let live = materialize(host, node)?;
            let reference = host.child_at(parent, *index);
            if let Err(e) = host.insert_before(parent, live, reference) {
                host.release(live);
                return Err(e.into());
            }
        }
        ChildOp::Move { from, to } => {
            let child = host.child_at(parent, *from).ok_or_else(|| missing(*from))?;
            host.remove_child(parent, child)?;
            let reference = host.child_at(parent, *to);
            host.insert_before(parent, child, reference)?;
        }
    }
    Ok(())
}

fn replace<H: Host + ?Sized>(
    host: &mut H,
    container: NodeId,
    old: NodeId,
    node: &VNode,
) -> Result<(), RenderError> {
    let parent = host.parent(old).unwrap_or(container);
    let live = materialize(host, node)?;
    if let Err(e) = host.replace_child(parent, live, old) {
        host.release(live);
        return Err(e.into());
    }
    host.release(old);
    Ok(())
}
