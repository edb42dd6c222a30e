//! Tree diffing.
//!
//! [`diff`] compares two trees and produces a [`Patch`] whose paths address
//! the old tree. It never executes components: two component nodes with the
//! same identity and equal props are considered unchanged, anything else is
//! replaced.
//!
//! # Child lists
//!
//! Children are matched in three steps:
//!
//! 1. **Match** keyed children by key, and unkeyed children by their ordinal
//!    among the unkeyed children. On duplicate keys the first occurrence keeps
//!    the key and the rest are matched as unkeyed.
//! 2. **Remove** old children without a match, highest index first.
//! 3. **Place** new children right to left. Matched children on the longest
//!    increasing subsequence of new positions stay put; every other matched
//!    child is moved in front of its right neighbour, and unmatched children
//!    are inserted there.
//!
//! Step 3 moves as few nodes as possible, so keyed nodes keep their live
//! identity across reorders.
//!
//! # Op order
//!
//! Ops are emitted grouped by phase: prop updates, text updates, child list
//! changes, then replacements. Patch application resolves every path before
//! mutating, so the grouping is for readability of the patch.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::patch::{ChildOp, NodePath, Patch, PatchOp, PropChange, PropChanges};
use crate::sanitize::SafeText;
use crate::vnode::{Key, Kind, PropValue, Props, VNode};

/// Compute the patch turning `old` into `new`.
pub fn diff(old: &VNode, new: &VNode) -> Patch {
    let mut collector = Collector::default();
    diff_node(old, new, NodePath::root(), &mut collector);
    let patch = collector.finish();
    debug!(
        ops = patch.len(),
        moves = patch.count_moves(),
        replacements = patch.count_replacements(),
        "diff complete"
    );
    patch
}

/// Like [`diff`], where either side may be absent.
///
/// Mounting and unmounting are expressed as a child list change on the
/// container (the empty path).
pub fn diff_optional(old: Option<&VNode>, new: Option<&VNode>) -> Patch {
    match (old, new) {
        (None, None) => Patch::default(),
        (None, Some(new)) => Patch::new(vec![PatchOp::ReorderChildren {
            path: NodePath::container(),
            ops: vec![ChildOp::Insert {
                index: 0,
                node: new.clone(),
            }],
        }]),
        (Some(_), None) => Patch::new(vec![PatchOp::ReorderChildren {
            path: NodePath::container(),
            ops: vec![ChildOp::Remove { index: 0 }],
        }]),
        (Some(old), Some(new)) => diff(old, new),
    }
}

#[derive(Default)]
struct Collector {
    props: Vec<PatchOp>,
    text: Vec<PatchOp>,
    reorders: Vec<PatchOp>,
    replaces: Vec<PatchOp>,
}

impl Collector {
    fn replace(&mut self, path: NodePath, node: &VNode) {
        self.replaces.push(PatchOp::ReplaceNode {
            path,
            node: node.clone(),
        });
    }

    fn finish(self) -> Patch {
        let mut ops = self.props;
        ops.extend(self.text);
        ops.extend(self.reorders);
        ops.extend(self.replaces);
        Patch::new(ops)
    }
}

fn diff_node(old: &VNode, new: &VNode, path: NodePath, out: &mut Collector) {
    if old.ptr_eq(new) {
        return;
    }
    if !old.kind().same_as(new.kind()) || old.key() != new.key() {
        out.replace(path, new);
        return;
    }

    match new.kind() {
        Kind::Text => {
            if old.text() != new.text() {
                out.text.push(PatchOp::SetText {
                    path,
                    text: new.text().unwrap_or("").to_string(),
                });
            }
        }
        Kind::Component(_) => {
            if old.props() != new.props() {
                out.replace(path, new);
            }
        }
        Kind::Tag(_) => {
            let changes = diff_props(old.props(), new.props());
            if !changes.is_empty() {
                out.props.push(PatchOp::UpdateProps {
                    path: path.clone(),
                    changes,
                });
            }
            diff_children(old.children(), new.children(), path, out);
        }
    }
}

fn diff_props(old: &Props, new: &Props) -> PropChanges {
    let mut changes = PropChanges::new();
    for (name, value) in new.iter() {
        match (old.get(name), value) {
            (Some(before), _) if before == value => {}
            (Some(PropValue::Style(before)), PropValue::Style(after)) => {
                changes.push(diff_style(name, before, after));
            }
            _ => changes.push(PropChange::Set {
                name: name.to_string(),
                value: value.clone(),
            }),
        }
    }
    for (name, _) in old.iter() {
        if !new.contains(name) {
            changes.push(PropChange::Remove {
                name: name.to_string(),
            });
        }
    }
    changes
}

fn diff_style(
    name: &str,
    old: &BTreeMap<String, SafeText>,
    new: &BTreeMap<String, SafeText>,
) -> PropChange {
    let set = new
        .iter()
        .filter(|(property, value)| old.get(*property) != Some(*value))
        .map(|(property, value)| (property.clone(), value.clone()))
        .collect();
    let removed = old
        .keys()
        .filter(|property| !new.contains_key(*property))
        .cloned()
        .collect();
    PropChange::Style {
        name: name.to_string(),
        set,
        removed,
    }
}

/// Pair each new child with the old child it continues, if any.
fn match_children(old: &[VNode], new: &[VNode]) -> Vec<Option<usize>> {
    let mut keyed: HashMap<&Key, usize> = HashMap::new();
    let mut unkeyed = Vec::new();
    for (i, child) in old.iter().enumerate() {
        match child.key() {
            Some(key) if !keyed.contains_key(key) => {
                keyed.insert(key, i);
            }
            Some(key) => {
                warn!(key = %key, "duplicate key among old siblings");
                unkeyed.push(i);
            }
            None => unkeyed.push(i),
        }
    }

    let mut seen: HashSet<&Key> = HashSet::new();
    let mut next_unkeyed = unkeyed.into_iter();
    new.iter()
        .map(|child| match child.key() {
            Some(key) if seen.insert(key) => keyed.remove(key),
            Some(key) => {
                warn!(key = %key, "duplicate key among new siblings");
                next_unkeyed.next()
            }
            None => next_unkeyed.next(),
        })
        .collect()
}

/// Positions of one longest strictly increasing subsequence of `seq`.
///
/// Among equally long subsequences the one using the earliest positions is
/// chosen.
pub(crate) fn longest_increasing_subsequence(seq: &[usize]) -> Vec<bool> {
    let n = seq.len();
    let mut keep = vec![false; n];
    if n == 0 {
        return keep;
    }

    // run[i]: length of the longest increasing run starting at i.
    // tails[l]: largest first value among runs of length l + 1 seen so far
    // (strictly decreasing in l).
    let mut run = vec![0usize; n];
    let mut tails: Vec<usize> = Vec::new();
    for i in (0..n).rev() {
        let x = seq[i];
        let l = tails.partition_point(|&t| t > x);
        run[i] = l + 1;
        if l == tails.len() {
            tails.push(x);
        } else {
            tails[l] = x;
        }
    }

    let mut need = tails.len();
    let mut last: Option<usize> = None;
    for i in 0..n {
        if need == 0 {
            break;
        }
        if run[i] == need && last.map_or(true, |prev| seq[i] > prev) {
            keep[i] = true;
            last = Some(seq[i]);
            need -= 1;
        }
    }
    keep
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    Old(usize),
    New(usize),
}

fn diff_children(old: &[VNode], new: &[VNode], path: NodePath, out: &mut Collector) {
    if old.is_empty() && new.is_empty() {
        return;
    }

    let new_to_old = match_children(old, new);
    let mut old_to_new: Vec<Option<usize>> = vec![None; old.len()];
    for (j, matched) in new_to_old.iter().enumerate() {
        if let Some(i) = matched {
            old_to_new[*i] = Some(j);
        }
    }

    let mut ops = Vec::new();

    // Removals, highest index first so earlier indices stay valid.
    for i in (0..old.len()).rev() {
        if old_to_new[i].is_none() {
            ops.push(ChildOp::Remove { index: i });
        }
    }

    // Survivors in old order, and which of them stay put.
    let survivors: Vec<usize> = (0..old.len()).filter(|i| old_to_new[*i].is_some()).collect();
    let order: Vec<usize> = survivors
        .iter()
        .filter_map(|i| old_to_new[*i])
        .collect();
    let stable_flags = longest_increasing_subsequence(&order);
    let stable: HashSet<usize> = survivors
        .iter()
        .zip(stable_flags)
        .filter_map(|(i, keep)| keep.then_some(*i))
        .collect();

    let mut live: Vec<Slot> = survivors.iter().map(|i| Slot::Old(*i)).collect();

    for j in (0..new.len()).rev() {
        let anchor = if j + 1 < new.len() {
            Some(match new_to_old[j + 1] {
                Some(i) => Slot::Old(i),
                None => Slot::New(j + 1),
            })
        } else {
            None
        };
        let anchor_index = |live: &[Slot]| {
            anchor
                .and_then(|a| live.iter().position(|s| *s == a))
                .unwrap_or(live.len())
        };

        match new_to_old[j] {
            None => {
                let index = anchor_index(&live);
                live.insert(index, Slot::New(j));
                ops.push(ChildOp::Insert {
                    index,
                    node: new[j].clone(),
                });
            }
            Some(i) if stable.contains(&i) => {}
            Some(i) => {
                let Some(from) = live.iter().position(|s| *s == Slot::Old(i)) else {
                    continue;
                };
                live.remove(from);
                let to = anchor_index(&live);
                live.insert(to, Slot::Old(i));
                if to != from {
                    ops.push(ChildOp::Move { from, to });
                }
            }
        }
    }

    if !ops.is_empty() {
        out.reorders.push(PatchOp::ReorderChildren {
            path: path.clone(),
            ops,
        });
    }

    for (j, matched) in new_to_old.iter().enumerate() {
        if let Some(i) = matched {
            diff_node(&old[*i], &new[j], path.child(*i), out);
        }
    }
}
