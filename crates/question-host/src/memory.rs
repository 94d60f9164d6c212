//! Retained in-memory element tree implementing [`Toolkit`].
//!
//! Geometry is deliberately simple: an element is as tall as its intrinsic
//! height when one is set, otherwise one line for markup plus the heights of
//! its in-flow children, clamped by `max-height` (inline style first, then
//! the max-height rules registered for its tag or classes).

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use question_core::{DomEvent, EventKind, Listener, NodeId, Toolkit};
use serde::Serialize;

const DEFAULT_LINE_HEIGHT: f64 = 20.0;

/// Observable tree mutation, recorded in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Attached { node: NodeId, parent: NodeId },
    Detached { node: NodeId },
    Removed { node: NodeId },
    Focused { node: NodeId },
    Blurred { node: NodeId },
    ClassAdded { node: NodeId, class: String },
    ClassRemoved { node: NodeId, class: String },
    Style {
        node: NodeId,
        property: String,
        value: Option<String>,
    },
}

#[derive(Default)]
struct Element {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    html: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    intrinsic_height: Option<f64>,
    root: bool,
    removed: bool,
    listeners: Vec<(EventKind, Listener)>,
}

/// Serializable view of an element subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSnapshot {
    pub tag: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub styles: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSnapshot>,
}

pub struct MemoryDom {
    elements: RefCell<Vec<Element>>,
    focused: Cell<Option<NodeId>>,
    journal: RefCell<Vec<Mutation>>,
    max_height_rules: RefCell<BTreeMap<String, f64>>,
    line_height: f64,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        Self {
            elements: RefCell::new(Vec::new()),
            focused: Cell::new(None),
            journal: RefCell::new(Vec::new()),
            max_height_rules: RefCell::new(BTreeMap::new()),
            line_height: DEFAULT_LINE_HEIGHT,
        }
    }

    /// Creates a live root; everything attached below it is displayed.
    pub fn create_root(&self) -> NodeId {
        self.push(Element {
            tag: "body".into(),
            root: true,
            ..Element::default()
        })
    }

    /// Creates a live `div` container under a fresh root.
    pub fn create_container(&self) -> NodeId {
        let root = self.create_root();
        let container = self.create_element("div", "");
        self.append(root, container);
        container
    }

    pub fn set_intrinsic_height(&self, node: NodeId, height: f64) {
        self.with_element_mut(node, |element| element.intrinsic_height = Some(height));
    }

    /// Stylesheet-like `max-height` for a tag or class.
    pub fn add_max_height_rule(&self, selector: &str, height: f64) {
        self.max_height_rules
            .borrow_mut()
            .insert(selector.to_string(), height);
    }

    /// Delivers `event` to the listeners registered on `node`.
    pub fn dispatch(&self, node: NodeId, event: DomEvent) {
        let listeners: Vec<Listener> = {
            let elements = self.elements.borrow();
            match elements.get(index(node)) {
                Some(element) if !element.removed => element
                    .listeners
                    .iter()
                    .filter(|(kind, _)| *kind == event.kind())
                    .map(|(_, listener)| listener.clone())
                    .collect(),
                _ => Vec::new(),
            }
        };
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn click(&self, node: NodeId) {
        self.dispatch(node, DomEvent::Click { button: 1 });
    }

    pub fn press_key(&self, node: NodeId, key: char) {
        self.dispatch(node, DomEvent::KeyPress { key });
    }

    /// Simulates an image finishing loading with the given natural size.
    pub fn load_image(&self, node: NodeId, width: f64, height: f64) {
        self.with_element_mut(node, |element| {
            element.intrinsic_height = Some(height);
            element
                .attributes
                .insert("naturalWidth".into(), width.to_string());
        });
        self.dispatch(node, DomEvent::Load { width, height });
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused.get()
    }

    pub fn journal(&self) -> Vec<Mutation> {
        self.journal.borrow().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.borrow_mut().clear();
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.read(node, |element| element.children.clone())
            .unwrap_or_default()
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.read(node, |element| element.classes.clone())
            .unwrap_or_default()
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.read(node, |element| element.tag.clone())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.read(node, |element| element.attributes.get(name).cloned())
            .flatten()
    }

    pub fn html(&self, node: NodeId) -> Option<String> {
        self.read(node, |element| element.html.clone()).flatten()
    }

    /// Concatenated markup of `node` and its descendants.
    pub fn text(&self, node: NodeId) -> String {
        let mut text = self.html(node).unwrap_or_default();
        for child in self.children(node) {
            text.push_str(&self.text(child));
        }
        text
    }

    /// First element below `node` (depth first, `node` included) with `class`.
    pub fn find_by_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        if self.has_class(node, class) {
            return Some(node);
        }
        self.children(node)
            .into_iter()
            .find_map(|child| self.find_by_class(child, class))
    }

    pub fn find_by_tag(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        if self.tag(node).as_deref() == Some(tag) {
            return Some(node);
        }
        self.children(node)
            .into_iter()
            .find_map(|child| self.find_by_tag(child, tag))
    }

    pub fn snapshot(&self, node: NodeId) -> ElementSnapshot {
        let elements = self.elements.borrow();
        self.snapshot_of(&elements, node)
    }

    /// Indented outline of the subtree, one element per line.
    pub fn outline(&self, node: NodeId) -> String {
        let mut lines = Vec::new();
        outline_into(&self.snapshot(node), 0, &mut lines);
        lines.join("\n")
    }

    fn snapshot_of(&self, elements: &[Element], node: NodeId) -> ElementSnapshot {
        let element = &elements[index(node)];
        ElementSnapshot {
            tag: element.tag.clone(),
            classes: element.classes.clone(),
            attributes: element.attributes.clone(),
            styles: element.styles.clone(),
            html: element.html.clone(),
            focused: self.focused.get() == Some(node),
            children: element
                .children
                .iter()
                .map(|child| self.snapshot_of(elements, *child))
                .collect(),
        }
    }

    fn push(&self, element: Element) -> NodeId {
        let mut elements = self.elements.borrow_mut();
        elements.push(element);
        NodeId((elements.len() - 1) as u64)
    }

    fn read<T>(&self, node: NodeId, read: impl FnOnce(&Element) -> T) -> Option<T> {
        self.elements.borrow().get(index(node)).map(read)
    }

    fn with_element_mut(&self, node: NodeId, update: impl FnOnce(&mut Element)) {
        if let Some(element) = self.elements.borrow_mut().get_mut(index(node)) {
            update(element);
        }
    }

    fn record(&self, mutation: Mutation) {
        self.journal.borrow_mut().push(mutation);
    }

    fn contains(elements: &[Element], ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = elements[index(id)].parent;
        }
        false
    }

    fn unlink(elements: &mut [Element], node: NodeId) -> bool {
        let Some(parent) = elements[index(node)].parent.take() else {
            return false;
        };
        elements[index(parent)]
            .children
            .retain(|child| *child != node);
        true
    }

    /// Links `node` under `parent` at `position`, refusing cycles.
    fn link(&self, parent: NodeId, node: NodeId, position: impl FnOnce(&[NodeId]) -> usize) {
        {
            let mut elements = self.elements.borrow_mut();
            if index(parent) >= elements.len()
                || index(node) >= elements.len()
                || Self::contains(&elements, node, parent)
            {
                return;
            }
            Self::unlink(&mut elements, node);
            let at = position(&elements[index(parent)].children)
                .min(elements[index(parent)].children.len());
            elements[index(parent)].children.insert(at, node);
            elements[index(node)].parent = Some(parent);
        }
        self.record(Mutation::Attached { node, parent });
    }

    fn blur_within(&self, node: NodeId) {
        let Some(focused) = self.focused.get() else {
            return;
        };
        let inside = Self::contains(&self.elements.borrow(), node, focused);
        if inside {
            self.focused.set(None);
            self.record(Mutation::Blurred { node: focused });
        }
    }

    fn max_height(&self, element: &Element) -> f64 {
        if let Some(value) = element.styles.get("max-height") {
            return parse_length(value);
        }
        let rules = self.max_height_rules.borrow();
        rules
            .iter()
            .filter(|(selector, _)| {
                **selector == element.tag || element.classes.iter().any(|class| class == *selector)
            })
            .map(|(_, height)| *height)
            .fold(f64::INFINITY, f64::min)
    }

    fn height_of(&self, elements: &[Element], node: NodeId) -> f64 {
        let element = &elements[index(node)];
        if element.styles.get("display").map(String::as_str) == Some("none") {
            return 0.0;
        }
        let natural = element.intrinsic_height.unwrap_or_else(|| {
            let own = match &element.html {
                Some(html) if !html.is_empty() => self.line_height,
                _ => 0.0,
            };
            own + element
                .children
                .iter()
                .filter(|child| {
                    elements[index(**child)].styles.get("position").map(String::as_str)
                        != Some("absolute")
                })
                .map(|child| self.height_of(elements, *child))
                .sum::<f64>()
        });
        natural.min(self.max_height(element))
    }

    fn clone_subtree(&self, node: NodeId, parent: Option<NodeId>) -> NodeId {
        let (copy, children) = {
            let elements = self.elements.borrow();
            let source = &elements[index(node)];
            (
                Element {
                    tag: source.tag.clone(),
                    classes: source.classes.clone(),
                    attributes: source.attributes.clone(),
                    styles: source.styles.clone(),
                    html: source.html.clone(),
                    parent,
                    intrinsic_height: source.intrinsic_height,
                    ..Element::default()
                },
                source.children.clone(),
            )
        };
        let id = self.push(copy);
        let cloned: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.clone_subtree(child, Some(id)))
            .collect();
        self.with_element_mut(id, |element| element.children = cloned);
        id
    }
}

impl Toolkit for MemoryDom {
    fn create_element(&self, tag: &str, class: &str) -> NodeId {
        self.push(Element {
            tag: tag.to_string(),
            classes: class.split_whitespace().map(String::from).collect(),
            ..Element::default()
        })
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.with_element_mut(node, |element| {
            element
                .attributes
                .insert(name.to_string(), value.to_string());
        });
    }

    fn set_html(&self, node: NodeId, html: &str) {
        self.clear(node);
        self.with_element_mut(node, |element| element.html = Some(html.to_string()));
    }

    fn append(&self, parent: NodeId, child: NodeId) {
        self.link(parent, child, |children| children.len());
    }

    fn prepend(&self, parent: NodeId, child: NodeId) {
        self.link(parent, child, |_| 0);
    }

    fn insert_after(&self, reference: NodeId, node: NodeId) {
        if reference == node {
            return;
        }
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.link(parent, node, |children| {
            children
                .iter()
                .position(|child| *child == reference)
                .map_or(children.len(), |at| at + 1)
        });
    }

    fn clear(&self, node: NodeId) {
        for child in self.children(node) {
            self.detach(child);
        }
        self.with_element_mut(node, |element| element.html = None);
    }

    fn detach(&self, node: NodeId) {
        self.blur_within(node);
        let unlinked = {
            let mut elements = self.elements.borrow_mut();
            index(node) < elements.len() && Self::unlink(&mut elements, node)
        };
        if unlinked {
            self.record(Mutation::Detached { node });
        }
    }

    fn remove(&self, node: NodeId) {
        self.detach(node);
        self.with_element_mut(node, |element| {
            element.removed = true;
            element.listeners.clear();
        });
        self.record(Mutation::Removed { node });
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.read(node, |element| element.parent).flatten()
    }

    fn child_count(&self, node: NodeId) -> usize {
        self.read(node, |element| element.children.len())
            .unwrap_or(0)
    }

    fn add_class(&self, node: NodeId, class: &str) {
        let mut added = false;
        self.with_element_mut(node, |element| {
            if !element.classes.iter().any(|existing| existing == class) {
                element.classes.push(class.to_string());
                added = true;
            }
        });
        if added {
            self.record(Mutation::ClassAdded {
                node,
                class: class.to_string(),
            });
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        let mut removed = false;
        self.with_element_mut(node, |element| {
            let before = element.classes.len();
            element.classes.retain(|existing| existing != class);
            removed = element.classes.len() != before;
        });
        if removed {
            self.record(Mutation::ClassRemoved {
                node,
                class: class.to_string(),
            });
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.read(node, |element| element.classes.iter().any(|existing| existing == class))
            .unwrap_or(false)
    }

    fn set_style(&self, node: NodeId, property: &str, value: Option<&str>) {
        self.with_element_mut(node, |element| match value {
            Some(value) => {
                element
                    .styles
                    .insert(property.to_string(), value.to_string());
            }
            None => {
                element.styles.remove(property);
            }
        });
        self.record(Mutation::Style {
            node,
            property: property.to_string(),
            value: value.map(String::from),
        });
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.read(node, |element| element.styles.get(property).cloned())
            .flatten()
    }

    fn is_visible(&self, node: NodeId) -> bool {
        let elements = self.elements.borrow();
        let mut current = node;
        loop {
            let Some(element) = elements.get(index(current)) else {
                return false;
            };
            if element.removed
                || element.styles.get("display").map(String::as_str) == Some("none")
            {
                return false;
            }
            if element.root {
                return true;
            }
            match element.parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn clone_node(&self, node: NodeId) -> NodeId {
        self.clone_subtree(node, None)
    }

    fn height(&self, node: NodeId) -> f64 {
        if !self.is_visible(node) {
            return 0.0;
        }
        let elements = self.elements.borrow();
        self.height_of(&elements, node)
    }

    fn focus(&self, node: NodeId) {
        if !self.is_visible(node) {
            return;
        }
        self.focused.set(Some(node));
        self.record(Mutation::Focused { node });
    }

    fn has_focus(&self, node: NodeId) -> bool {
        self.focused.get() == Some(node)
    }

    fn listen(&self, node: NodeId, kind: EventKind, listener: Listener) {
        self.with_element_mut(node, |element| element.listeners.push((kind, listener)));
    }
}

fn index(node: NodeId) -> usize {
    node.0 as usize
}

fn parse_length(value: &str) -> f64 {
    let value = value.trim();
    if value == "none" || value.is_empty() {
        return f64::INFINITY;
    }
    value
        .trim_end_matches("px")
        .parse::<f64>()
        .unwrap_or(f64::INFINITY)
}

fn outline_into(snapshot: &ElementSnapshot, depth: usize, lines: &mut Vec<String>) {
    let mut line = format!("{}{}", "  ".repeat(depth), snapshot.tag);
    for class in &snapshot.classes {
        line.push('.');
        line.push_str(class);
    }
    if !snapshot.styles.is_empty() {
        let styles = snapshot
            .styles
            .iter()
            .map(|(property, value)| format!("{property}: {value}"))
            .collect::<Vec<_>>()
            .join("; ");
        line.push_str(&format!(" [{styles}]"));
    }
    if let Some(html) = &snapshot.html {
        line.push_str(&format!(" {html:?}"));
    }
    if snapshot.focused {
        line.push_str(" (focused)");
    }
    lines.push(line);
    for child in &snapshot.children {
        outline_into(child, depth + 1, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_follows_root_attachment() {
        let dom = MemoryDom::new();
        let container = dom.create_container();
        let child = dom.create_element("div", "a b");

        assert!(!dom.is_visible(child));
        dom.append(container, child);
        assert!(dom.is_visible(child));
        assert!(dom.has_class(child, "b"));

        dom.detach(child);
        assert!(!dom.is_visible(child));
        assert_eq!(dom.parent(child), None);
    }

    #[test]
    fn insert_after_moves_within_parent() {
        let dom = MemoryDom::new();
        let container = dom.create_container();
        let a = dom.create_element("div", "a");
        let b = dom.create_element("div", "b");
        let c = dom.create_element("div", "c");
        for node in [a, b, c] {
            dom.append(container, node);
        }

        dom.insert_after(a, c);
        assert_eq!(dom.children(container), vec![a, c, b]);
        dom.prepend(container, b);
        assert_eq!(dom.children(container), vec![b, a, c]);
    }

    #[test]
    fn height_is_clamped_by_inline_style_then_rules() {
        let dom = MemoryDom::new();
        let container = dom.create_container();
        let group = dom.create_element("div", "group");
        dom.append(container, group);
        for _ in 0..3 {
            let item = dom.create_element("button", "");
            dom.set_intrinsic_height(item, 30.0);
            dom.append(group, item);
        }

        assert_eq!(dom.height(group), 90.0);
        dom.add_max_height_rule("group", 50.0);
        assert_eq!(dom.height(group), 50.0);
        dom.set_style(group, "max-height", Some("none"));
        assert_eq!(dom.height(group), 90.0);
        dom.set_style(group, "max-height", Some("0"));
        assert_eq!(dom.height(group), 0.0);
    }

    #[test]
    fn clones_are_detached_deep_copies_without_listeners() {
        let dom = MemoryDom::new();
        let container = dom.create_container();
        let parent = dom.create_element("div", "panel");
        let child = dom.create_element("p", "");
        dom.set_html(child, "hello");
        dom.append(parent, child);
        dom.append(container, parent);

        let clicks = std::rc::Rc::new(Cell::new(0));
        let counter = clicks.clone();
        dom.listen(
            parent,
            EventKind::Click,
            std::rc::Rc::new(move |_: &DomEvent| counter.set(counter.get() + 1)),
        );

        let copy = dom.clone_node(parent);
        assert_eq!(dom.parent(copy), None);
        assert_eq!(dom.text(copy), "hello");
        dom.click(copy);
        dom.click(parent);
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn detaching_focused_subtree_blurs() {
        let dom = MemoryDom::new();
        let container = dom.create_container();
        let button = dom.create_element("button", "");
        dom.append(container, button);

        dom.focus(button);
        assert!(dom.has_focus(button));
        dom.detach(button);
        assert_eq!(dom.focused(), None);
        assert!(
            dom.journal()
                .contains(&Mutation::Blurred { node: button })
        );

        dom.focus(button);
        assert_eq!(dom.focused(), None);
    }

    #[test]
    fn outline_lists_classes_styles_and_markup() {
        let dom = MemoryDom::new();
        let container = dom.create_container();
        let section = dom.create_element("div", "h5p-question-content");
        dom.set_html(section, "Pick one");
        dom.set_style(section, "max-height", Some("20px"));
        dom.append(container, section);

        let outline = dom.outline(container);
        assert_eq!(
            outline,
            "div\n  div.h5p-question-content [max-height: 20px] \"Pick one\""
        );
    }
}
