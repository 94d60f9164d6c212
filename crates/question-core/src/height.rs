//! Height bounds that let a CSS `max-height` transition animate between a
//! collapsed and an open container.

use tracing::trace;

use crate::toolkit::{NodeId, Toolkit};

pub const MAX_HEIGHT: &str = "max-height";

/// Applies the natural height of `node` as its height bound.
///
/// A node that is not displayed gets an unconstrained bound instead.
pub fn set_element_height(toolkit: &dyn Toolkit, node: NodeId) {
    if !toolkit.is_visible(node) {
        toolkit.set_style(node, MAX_HEIGHT, Some("none"));
        return;
    }

    let height = natural_height(toolkit, node);
    trace!(?node, height, "applying natural height");
    toolkit.set_style(node, MAX_HEIGHT, Some(&px(height)));
}

/// Measures the unconstrained height of `node` on an off-flow clone.
pub fn natural_height(toolkit: &dyn Toolkit, node: NodeId) -> f64 {
    let probe = toolkit.clone_node(node);
    toolkit.set_style(probe, "position", Some("absolute"));
    toolkit.set_style(probe, MAX_HEIGHT, Some("none"));
    if let Some(parent) = toolkit.parent(node) {
        toolkit.append(parent, probe);
    }
    let height = toolkit.height(probe);
    toolkit.remove(probe);
    height
}

/// Starts the closing transition.
pub fn collapse(toolkit: &dyn Toolkit, node: NodeId) {
    toolkit.set_style(node, MAX_HEIGHT, Some("0"));
}

pub fn px(value: f64) -> String {
    format!("{value}px")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn px_drops_trailing_fraction() {
        assert_eq!(px(60.0), "60px");
        assert_eq!(px(12.5), "12.5px");
    }
}
