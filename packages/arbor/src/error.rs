//! Structured error types and the patch application report for arbor.
//!
//! Each layer of the engine has its own pattern-matchable error enum:
//!
//! - [`VNodeError`] is returned while building trees (invalid kind, malformed props)
//! - [`HostError`] is returned by the [`Host`](crate::dom::Host) document
//! - [`RenderError`] covers component resolution, materialization and patching
//! - [`EffectError`] is the "left" value every effect executor returns
//!
//! # The Error Boundary Rule
//!
//! > **No panic and no `anyhow::Error` crosses a render or executor boundary.**
//!
//! - `anyhow` is internal transport (ergonomic inside component and task bodies)
//! - the enums in this module are the only externalized errors
//!
//! # ApplyReport Example
//!
//! ```ignore
//! let report = arbor::apply(&mut doc, &patch, container)?;
//! if !report.is_complete() {
//!     for failure in &report.failures {
//!         eprintln!("op {} at {} failed: {}", failure.op_index, failure.path, failure.error);
//!     }
//! }
//! ```

use std::fmt;

use thiserror::Error;

use crate::dom::NodeId;
use crate::effect::Category;
use crate::patch::NodePath;
use crate::sanitize::NameError;

// =============================================================================
// Construction Errors
// =============================================================================

/// Failure while building a virtual node.
///
/// Construction never panics; every invalid input is reported through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VNodeError {
    /// The node kind is not a valid tag name or component.
    #[error("invalid element kind {kind:?}: {reason}")]
    InvalidKind {
        /// The rejected kind, rendered for diagnostics.
        kind: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A prop cannot be stored on a node.
    #[error("malformed prop {name:?}: {reason}")]
    MalformedProp {
        /// The prop name as given.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

// =============================================================================
// Host Errors
// =============================================================================

/// Failure reported by a host document operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The node id does not refer to a live node.
    #[error("node {0} does not exist")]
    NoSuchNode(NodeId),

    /// The operation requires an element but the node is not one.
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// The operation requires a text node but the node is not one.
    #[error("node {0} is not a text node")]
    NotText(NodeId),

    /// The child is not attached to the given parent.
    #[error("node {child} is not a child of {parent}")]
    NotAChild {
        /// Expected parent.
        parent: NodeId,
        /// Offending child.
        child: NodeId,
    },

    /// Attaching the node would make it its own ancestor.
    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle {
        /// Prospective parent.
        parent: NodeId,
        /// Node being inserted.
        child: NodeId,
    },

    /// The tag name cannot be used to create an element.
    #[error("invalid tag name {0:?}")]
    InvalidTag(String),

    /// The attribute name cannot be serialized safely.
    #[error("invalid attribute name {name:?}: {reason}")]
    InvalidAttribute {
        /// The name as given.
        name: String,
        reason: NameError,
    },

    /// The class token cannot be stored in a class list.
    #[error("invalid class {class:?}: {reason}")]
    InvalidClass { class: String, reason: NameError },

    /// The style declaration was refused.
    #[error("invalid style declaration {property:?}: {reason}")]
    InvalidStyle {
        /// The property name as given.
        property: String,
        reason: String,
    },

    /// The document cannot address any more nodes.
    #[error("document node capacity exhausted")]
    CapacityExceeded,

    /// The selector could not be parsed.
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector {
        /// The selector as given.
        selector: String,
        /// Parse failure description.
        reason: &'static str,
    },
}

// =============================================================================
// Render Errors
// =============================================================================

/// Failure while resolving, materializing or patching a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A function component returned an error or panicked.
    #[error("component {component} failed: {message}")]
    ComponentFailed {
        /// Display name of the component.
        component: String,
        /// The error or panic message.
        message: String,
    },

    /// A patch path does not resolve to a live node.
    #[error("no live node at path {path}")]
    MissingNode {
        /// The unresolved path.
        path: NodePath,
    },

    /// The mount container is not a live element.
    #[error("container {0} is not a live element")]
    InvalidContainer(NodeId),

    /// The host rejected an operation.
    #[error(transparent)]
    Host(#[from] HostError),
}

// =============================================================================
// Effect Errors
// =============================================================================

/// The "left" value of an effect execution.
///
/// Executors never panic and never retry; every failure comes back as one of
/// these variants for the caller to branch on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    /// The operation is not part of the category this build understands.
    #[error("unknown {category} operation: {operation}")]
    UnknownOperation {
        /// Category of the rejected effect.
        category: Category,
        /// Operation name as received.
        operation: String,
    },

    /// The payload failed validation.
    #[error("invalid input for {operation}: {message}")]
    InvalidInput {
        /// Operation that rejected its input.
        operation: &'static str,
        /// What was wrong.
        message: String,
    },

    /// The environment lacks the capability this effect needs.
    #[error("{0}")]
    Unsupported(String),

    /// The network request failed below the HTTP layer.
    #[error("request failed: {0}")]
    Transport(String),

    /// The key-value store rejected the operation.
    #[error("storage failure: {0}")]
    Storage(String),

    /// An async task returned an error.
    #[error("task failed: {0}")]
    Task(String),

    /// User code run by the executor panicked.
    #[error("{operation} panicked: {message}")]
    Panicked {
        /// Operation whose callback or task panicked.
        operation: &'static str,
        /// Panic message.
        message: String,
    },
}

impl EffectError {
    pub(crate) fn invalid(operation: &'static str, message: impl fmt::Display) -> Self {
        EffectError::InvalidInput {
            operation,
            message: message.to_string(),
        }
    }
}

// =============================================================================
// Apply Report
// =============================================================================

/// One patch operation that could not be applied.
#[derive(Debug, Clone)]
pub struct PatchFailure {
    /// Index of the operation inside the patch.
    pub op_index: usize,
    /// Operation name (`"update-props"`, `"reorder-children"`, ...).
    pub op: &'static str,
    /// Old-tree path the operation targeted.
    pub path: NodePath,
    /// Why it failed.
    pub error: RenderError,
}

/// Outcome of applying a patch.
///
/// Patch application is best-effort, not all-or-nothing. Instead of pretending
/// otherwise, the report says exactly what happened so the caller can:
/// - log or surface the failed operations
/// - decide whether a full re-mount is warranted
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// Number of individual mutations that succeeded.
    pub applied: usize,
    /// Mutations that failed; the rest of the patch still ran.
    pub failures: Vec<PatchFailure>,
}

impl ApplyReport {
    /// Returns true if every mutation succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Merges another report into this one.
    pub fn absorb(&mut self, other: ApplyReport) {
        self.applied += other.applied;
        self.failures.extend(other.failures);
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            write!(f, "patch complete: {} applied", self.applied)
        } else {
            write!(
                f,
                "patch partial: {} applied, {} failed",
                self.applied,
                self.failures.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_kind_display() {
        let err = VNodeError::InvalidKind {
            kind: "".into(),
            reason: "tag name is empty",
        };
        assert!(err.to_string().contains("invalid element kind"));
        assert!(err.to_string().contains("tag name is empty"));
    }

    #[test]
    fn test_unknown_operation_display() {
        let err = EffectError::UnknownOperation {
            category: Category::Dom,
            operation: "teleport".into(),
        };
        assert_eq!(err.to_string(), "unknown dom operation: teleport");
    }

    #[test]
    fn test_host_error_converts_into_render_error() {
        let err: RenderError = HostError::NoSuchNode(NodeId::from_raw(7)).into();
        match &err {
            RenderError::Host(HostError::NoSuchNode(id)) => assert_eq!(id.raw(), 7),
            _ => panic!("Expected Host(NoSuchNode)"),
        }
        assert!(err.to_string().contains("does not exist"));
    }

    // ==========================================================================
    // ApplyReport Tests
    // ==========================================================================

    #[test]
    fn test_apply_report_complete() {
        let report = ApplyReport {
            applied: 4,
            failures: vec![],
        };
        assert!(report.is_complete());
        assert!(report.to_string().contains("complete"));
    }

    #[test]
    fn test_apply_report_partial() {
        let mut report = ApplyReport {
            applied: 2,
            failures: vec![],
        };
        report.absorb(ApplyReport {
            applied: 1,
            failures: vec![PatchFailure {
                op_index: 3,
                op: "set-text",
                path: NodePath::root().child(0),
                error: RenderError::MissingNode {
                    path: NodePath::root().child(0),
                },
            }],
        });

        assert!(!report.is_complete());
        assert_eq!(report.applied, 3);
        let display = report.to_string();
        assert!(display.contains("partial"));
        assert!(display.contains("1 failed"));
    }
}
