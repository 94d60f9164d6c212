//! Interfaces consumed from the host UI toolkit.
//!
//! The composer never creates, measures or focuses elements itself; it only
//! drives an implementation of [`Toolkit`] and schedules work on a
//! [`TaskQueue`]. Widgets with their own look (buttons, score indicators) come
//! from a [`WidgetFactory`].

use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque handle to an element owned by the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Event kinds the composer listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    KeyPress,
    Load,
}

/// Event delivered to a listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DomEvent {
    /// Pointer activation; `button` follows the `which` numbering (1 = primary).
    Click { button: u16 },
    KeyPress { key: char },
    /// Resource finished loading, carrying its natural dimensions.
    Load { width: f64, height: f64 },
}

impl DomEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomEvent::Click { .. } => EventKind::Click,
            DomEvent::KeyPress { .. } => EventKind::KeyPress,
            DomEvent::Load { .. } => EventKind::Load,
        }
    }
}

pub type Listener = Rc<dyn Fn(&DomEvent)>;

/// Rendering primitives of the host toolkit.
///
/// All methods take `&self`: toolkits are shared between the composer, its
/// deferred callbacks and the host, so implementations keep their own
/// interior mutability.
pub trait Toolkit {
    fn create_element(&self, tag: &str, class: &str) -> NodeId;
    fn set_attribute(&self, node: NodeId, name: &str, value: &str);
    /// Replaces the children of `node` with markup.
    fn set_html(&self, node: NodeId, html: &str);
    fn append(&self, parent: NodeId, child: NodeId);
    fn prepend(&self, parent: NodeId, child: NodeId);
    /// Moves `node` right after `reference` under the same parent.
    fn insert_after(&self, reference: NodeId, node: NodeId);
    /// Detaches every child of `node` and drops its markup.
    fn clear(&self, node: NodeId);
    /// Takes `node` out of the tree, keeping it reusable.
    fn detach(&self, node: NodeId);
    /// Takes `node` out of the tree for good.
    fn remove(&self, node: NodeId);
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn child_count(&self, node: NodeId) -> usize;
    fn add_class(&self, node: NodeId, class: &str);
    fn remove_class(&self, node: NodeId, class: &str);
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    /// Sets an inline style property; `None` clears it.
    fn set_style(&self, node: NodeId, property: &str, value: Option<&str>);
    fn style(&self, node: NodeId, property: &str) -> Option<String>;
    /// Whether the node is attached to a live container and displayed.
    fn is_visible(&self, node: NodeId) -> bool;
    /// Deep copy of `node`, detached, without listeners.
    fn clone_node(&self, node: NodeId) -> NodeId;
    /// Rendered height in pixels.
    fn height(&self, node: NodeId) -> f64;
    fn focus(&self, node: NodeId);
    fn has_focus(&self, node: NodeId) -> bool;
    fn listen(&self, node: NodeId, kind: EventKind, listener: Listener);
}

/// Handle of a deferred task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub u64);

/// One-shot deferred callbacks on the host's task queue.
///
/// A zero delay runs the task on the next scheduling turn, never synchronously.
pub trait TaskQueue {
    fn defer(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TaskHandle;
}

/// Visual score indicator attached to the feedback panel.
pub trait ScoreIndicator {
    fn set_score(&self, score: u32);
    fn attach_to(&self, container: NodeId);
}

/// Configuration handed to [`WidgetFactory::create_button`].
#[derive(Clone)]
pub struct ButtonConfig {
    pub class: String,
    pub label: String,
    pub on_click: Rc<dyn Fn()>,
}

impl std::fmt::Debug for ButtonConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ButtonConfig")
            .field("class", &self.class)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Factories for the widgets the composer places but does not draw.
pub trait WidgetFactory {
    fn create_score_indicator(&self, max_score: u32) -> Box<dyn ScoreIndicator>;
    fn create_button(&self, config: ButtonConfig) -> NodeId;
}
