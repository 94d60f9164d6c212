use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::QuestionConfig;
use crate::toolkit::{NodeId, Toolkit};

/// Named slot of the composed widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionName {
    Image,
    Introduction,
    Content,
    Feedback,
    Buttons,
    Custom(String),
}

impl SectionName {
    pub fn as_str(&self) -> &str {
        match self {
            SectionName::Image => "image",
            SectionName::Introduction => "introduction",
            SectionName::Content => "content",
            SectionName::Feedback => "feedback",
            SectionName::Buttons => "buttons",
            SectionName::Custom(name) => name,
        }
    }

    pub fn default_order() -> Vec<SectionName> {
        vec![
            SectionName::Image,
            SectionName::Introduction,
            SectionName::Content,
            SectionName::Feedback,
            SectionName::Buttons,
        ]
    }
}

impl From<String> for SectionName {
    fn from(value: String) -> Self {
        match value.as_str() {
            "image" => SectionName::Image,
            "introduction" => SectionName::Introduction,
            "content" => SectionName::Content,
            "feedback" => SectionName::Feedback,
            "buttons" => SectionName::Buttons,
            _ => SectionName::Custom(value),
        }
    }
}

impl From<&str> for SectionName {
    fn from(value: &str) -> Self {
        SectionName::from(value.to_string())
    }
}

impl From<SectionName> for String {
    fn from(value: SectionName) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renderable section content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Content {
    Html(String),
    Node(NodeId),
}

impl Content {
    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Html(html) if html.trim().is_empty())
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Html(value.to_string())
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Html(value)
    }
}

impl From<NodeId> for Content {
    fn from(value: NodeId) -> Self {
        Content::Node(value)
    }
}

/// Extra options for the main content section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

#[derive(Debug, Clone)]
struct Section {
    node: NodeId,
    content: Option<Content>,
}

/// Named content slots, created lazily and updated in place.
#[derive(Debug, Default)]
pub struct SectionRegistry {
    sections: HashMap<SectionName, Section>,
}

impl SectionRegistry {
    /// Creates the slot when absent; an existing slot only gets its content replaced.
    pub fn register(
        &mut self,
        toolkit: &dyn Toolkit,
        config: &QuestionConfig,
        name: SectionName,
        content: Option<Content>,
    ) -> NodeId {
        if let Some(node) = self.node(&name) {
            if let Some(content) = content {
                self.update(toolkit, &name, content);
            }
            return node;
        }

        let node = toolkit.create_element("div", &config.class(name.as_str()));
        if let Some(content) = &content {
            fill(toolkit, node, content);
        }
        trace!(section = %name, "registered section");
        self.sections.insert(name, Section { node, content });
        node
    }

    /// Replaces the content of an existing slot, keeping its element.
    pub fn update(&mut self, toolkit: &dyn Toolkit, name: &SectionName, content: Content) -> bool {
        let Some(section) = self.sections.get_mut(name) else {
            return false;
        };
        fill(toolkit, section.node, &content);
        section.content = Some(content);
        true
    }

    pub fn get(&self, name: &SectionName) -> Option<&Content> {
        self.sections
            .get(name)
            .and_then(|section| section.content.as_ref())
    }

    pub fn node(&self, name: &SectionName) -> Option<NodeId> {
        self.sections.get(name).map(|section| section.node)
    }

    pub fn exists(&self, name: &SectionName) -> bool {
        self.sections.contains_key(name)
    }
}

fn fill(toolkit: &dyn Toolkit, node: NodeId, content: &Content) {
    match content {
        Content::Html(html) => toolkit.set_html(node, html),
        Content::Node(child) => {
            toolkit.clear(node);
            toolkit.append(node, *child);
        }
    }
}
