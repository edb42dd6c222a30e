//! Patch data: the minimal set of mutations turning one tree into another.
//!
//! Paths are child-index sequences into the **old** tree, relative to the
//! mount container: `[0]` is the root node, `[0, 2]` its third child, and the
//! empty path is the container itself.
//!
//! Child list indices inside [`PatchOp::ReorderChildren`] are sequential:
//! each [`ChildOp`] addresses the list as it stands after the previous one.

use std::fmt;

use smallvec::SmallVec;

use crate::sanitize::SafeText;
use crate::vnode::{PropValue, VNode};

/// Child-index path from the mount container.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(SmallVec<[usize; 8]>);

impl NodePath {
    /// The mount container.
    pub fn container() -> Self {
        NodePath(SmallVec::new())
    }

    /// The mounted root node, `[0]`.
    pub fn root() -> Self {
        Self::container().child(0)
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.0.push(index);
        path
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn is_container(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl From<&[usize]> for NodePath {
    fn from(indices: &[usize]) -> Self {
        NodePath(indices.iter().copied().collect())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath({self})")
    }
}

/// One prop change on an element.
#[derive(Debug, Clone, PartialEq)]
pub enum PropChange {
    Set { name: String, value: PropValue },
    Remove { name: String },
    /// Declaration-level update between two style maps.
    Style {
        name: String,
        set: Vec<(String, SafeText)>,
        removed: Vec<String>,
    },
}

impl PropChange {
    pub fn name(&self) -> &str {
        match self {
            PropChange::Set { name, .. }
            | PropChange::Remove { name }
            | PropChange::Style { name, .. } => name,
        }
    }
}

pub type PropChanges = SmallVec<[PropChange; 4]>;

/// One step of a child list reorder.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildOp {
    /// Drop (and release) the child at `index`.
    Remove { index: usize },
    /// Materialize `node` and insert it at `index`.
    Insert { index: usize, node: VNode },
    /// Take the child at `from` out, then insert it at `to`.
    Move { from: usize, to: usize },
}

/// One patch operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Swap the node at `path` for a freshly materialized `node`.
    ReplaceNode { path: NodePath, node: VNode },
    UpdateProps { path: NodePath, changes: PropChanges },
    /// Reorder, insert and remove children of the node at `path`.
    ReorderChildren { path: NodePath, ops: Vec<ChildOp> },
    /// `text` is raw; it is escaped when applied.
    SetText { path: NodePath, text: String },
}

impl PatchOp {
    pub fn path(&self) -> &NodePath {
        match self {
            PatchOp::ReplaceNode { path, .. }
            | PatchOp::UpdateProps { path, .. }
            | PatchOp::ReorderChildren { path, .. }
            | PatchOp::SetText { path, .. } => path,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PatchOp::ReplaceNode { .. } => "replace-node",
            PatchOp::UpdateProps { .. } => "update-props",
            PatchOp::ReorderChildren { .. } => "reorder-children",
            PatchOp::SetText { .. } => "set-text",
        }
    }
}

/// An ordered list of patch operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub(crate) ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Number of child moves across every reorder.
    pub fn count_moves(&self) -> usize {
        self.child_ops()
            .filter(|op| matches!(op, ChildOp::Move { .. }))
            .count()
    }

    pub fn count_inserts(&self) -> usize {
        self.child_ops()
            .filter(|op| matches!(op, ChildOp::Insert { .. }))
            .count()
    }

    pub fn count_removals(&self) -> usize {
        self.child_ops()
            .filter(|op| matches!(op, ChildOp::Remove { .. }))
            .count()
    }

    pub fn count_replacements(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, PatchOp::ReplaceNode { .. }))
            .count()
    }

    fn child_ops(&self) -> impl Iterator<Item = &ChildOp> {
        self.ops.iter().flat_map(|op| match op {
            PatchOp::ReorderChildren { ops, .. } => ops.as_slice(),
            _ => &[],
        })
    }
}

impl IntoIterator for Patch {
    type Item = PatchOp;
    type IntoIter = std::vec::IntoIter<PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ops ({} replaced, {} inserted, {} removed, {} moved)",
            self.len(),
            self.count_replacements(),
            self.count_inserts(),
            self.count_removals(),
            self.count_moves()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::text;

    #[test]
    fn test_path_display() {
        assert_eq!(NodePath::container().to_string(), "/");
        assert_eq!(NodePath::root().child(2).to_string(), "/0/2");
        assert_eq!(NodePath::from(&[0, 1][..]).depth(), 2);
    }

    #[test]
    fn test_patch_counts() {
        let patch = Patch::new(vec![
            PatchOp::ReorderChildren {
                path: NodePath::root(),
                ops: vec![
                    ChildOp::Remove { index: 3 },
                    ChildOp::Move { from: 2, to: 0 },
                    ChildOp::Insert {
                        index: 1,
                        node: text("x"),
                    },
                ],
            },
            PatchOp::ReplaceNode {
                path: NodePath::root().child(0),
                node: text("y"),
            },
        ]);

        assert_eq!(patch.count_moves(), 1);
        assert_eq!(patch.count_inserts(), 1);
        assert_eq!(patch.count_removals(), 1);
        assert_eq!(patch.count_replacements(), 1);
        assert_eq!(
            patch.to_string(),
            "2 ops (1 replaced, 1 inserted, 1 removed, 1 moved)"
        );
    }
}
