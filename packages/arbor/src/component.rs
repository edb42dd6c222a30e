//! Component resolution.
//!
//! A component vnode is resolved by calling its render function with the
//! node's props, repeatedly, until the result is an element or text node.
//! Both a returned error and a panic come back as
//! [`RenderError::ComponentFailed`]; neither escapes to the caller.

use tracing::{error, warn};

use crate::error::RenderError;
use crate::outcome::attempt;
use crate::vnode::{Component, Props, VNode};

/// Nesting limit for components that return components.
const MAX_DEPTH: usize = 256;

/// Resolve `node` to an element or text node.
///
/// Element and text nodes are returned unchanged.
pub fn resolve(node: &VNode) -> Result<VNode, RenderError> {
    let mut current = node.clone();
    let mut depth = 0;

    while let Some(component) = current.component().cloned() {
        if depth == MAX_DEPTH {
            return Err(RenderError::ComponentFailed {
                component: component.name().to_string(),
                message: format!("component nesting exceeded {MAX_DEPTH} levels"),
            });
        }
        current = render(&component, current.props())?;
        depth += 1;
    }
    Ok(current)
}

/// Run one render function under a panic guard.
pub fn render(component: &Component, props: &Props) -> Result<VNode, RenderError> {
    match attempt(|| component.render(props)) {
        Ok(Ok(node)) => Ok(node),
        Ok(Err(e)) => {
            warn!(component = component.name(), error = %e, "component returned an error");
            Err(RenderError::ComponentFailed {
                component: component.name().to_string(),
                message: format!("{e:#}"),
            })
        }
        Err(caught) => {
            error!(
                component = component.name(),
                panic = %caught.message,
                "component panicked during render"
            );
            Err(RenderError::ComponentFailed {
                component: component.name().to_string(),
                message: caught.message,
            })
        }
    }
}
