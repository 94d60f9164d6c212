use tracing::trace;

use crate::toolkit::{NodeId, Toolkit};

/// Places the element of `id` into `container` so that it follows the
/// nearest visible element declared before it in `order`, or becomes the
/// first child when none of its predecessors is visible.
///
/// Absent entries count as invisible. While `container` itself is not
/// displayed, "visible" means "currently a child of `container`", so layouts
/// built before attaching keep their declared order too. Re-inserting an
/// element that already sits at its computed position leaves the tree
/// unchanged. Returns `false` when `id` is not part of `order` or has no
/// element.
pub fn insert<K, F>(
    toolkit: &dyn Toolkit,
    order: &[K],
    id: &K,
    elements: F,
    container: NodeId,
) -> bool
where
    K: PartialEq + std::fmt::Debug,
    F: Fn(&K) -> Option<NodeId>,
{
    let Some(position) = order.iter().position(|candidate| candidate == id) else {
        trace!(?id, "insert skipped: id not in declared order");
        return false;
    };
    let Some(element) = elements(id) else {
        trace!(?id, "insert skipped: no element registered");
        return false;
    };

    let live = toolkit.is_visible(container);
    let present = |node: NodeId| {
        if live {
            toolkit.is_visible(node)
        } else {
            toolkit.parent(node) == Some(container)
        }
    };

    let predecessor = order[..position]
        .iter()
        .rev()
        .filter_map(|candidate| elements(candidate))
        .find(|node| present(*node));

    match predecessor {
        Some(anchor) => {
            trace!(?id, ?anchor, "inserting after nearest visible predecessor");
            toolkit.insert_after(anchor, element);
        }
        None => {
            trace!(?id, "inserting as first child");
            toolkit.prepend(container, element);
        }
    }
    true
}
