use std::collections::HashMap;

use serde::Serialize;

use crate::toolkit::NodeId;

/// Attachment state of a registered button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    /// Placed in the button group.
    Visible,
    /// Will be placed when the scheduler settles.
    PendingShow,
    /// Will be detached when the scheduler settles or its group finishes collapsing.
    PendingHide,
    Detached,
}

#[derive(Debug, Clone)]
struct Button {
    node: NodeId,
    label: String,
    order: usize,
}

/// Registered buttons and their declared order.
///
/// Order positions are assigned at registration and never change.
#[derive(Debug, Default)]
pub struct ButtonRegistry {
    buttons: HashMap<String, Button>,
    order: Vec<String>,
}

impl ButtonRegistry {
    /// Returns `false` when `id` is already registered.
    pub fn register(&mut self, id: &str, label: &str, node: NodeId) -> bool {
        if self.buttons.contains_key(id) {
            return false;
        }
        let order = self.order.len();
        self.order.push(id.to_string());
        self.buttons.insert(
            id.to_string(),
            Button {
                node,
                label: label.to_string(),
                order,
            },
        );
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.buttons.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<NodeId> {
        self.buttons.get(id).map(|button| button.node)
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.buttons.get(id).map(|button| button.label.as_str())
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.buttons.get(id).map(|button| button.order)
    }

    /// Button ids in registration order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent_and_keeps_order() {
        let mut registry = ButtonRegistry::default();
        assert!(registry.register("check", "Check", NodeId(1)));
        assert!(registry.register("retry", "Retry", NodeId(2)));
        assert!(!registry.register("check", "Check again", NodeId(3)));

        assert_eq!(registry.order(), ["check", "retry"]);
        assert_eq!(registry.node("check"), Some(NodeId(1)));
        assert_eq!(registry.label("check"), Some("Check"));
        assert_eq!(registry.position("retry"), Some(1));
        assert_eq!(registry.len(), 2);
    }
}
