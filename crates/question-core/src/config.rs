use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::section::SectionName;

/// Errors raised while loading a [`QuestionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse question config: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("section '{0}' appears more than once in the declared order")]
    DuplicateSection(String),
}

/// Composer settings shared by every question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionConfig {
    /// Declared section order.
    #[serde(default = "default_order")]
    #[schemars(with = "Vec<String>")]
    pub order: Vec<SectionName>,
    /// Prefix of every class the composer adds.
    #[serde(default = "default_class_prefix")]
    pub class_prefix: String,
    /// Fixed duration of the height transitions, in milliseconds.
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

fn default_order() -> Vec<SectionName> {
    SectionName::default_order()
}

fn default_class_prefix() -> String {
    "h5p-question".into()
}

fn default_transition_ms() -> u64 {
    150
}

impl Default for QuestionConfig {
    fn default() -> Self {
        Self {
            order: default_order(),
            class_prefix: default_class_prefix(),
            transition_ms: default_transition_ms(),
            base_path: None,
            content_id: None,
        }
    }
}

impl QuestionConfig {
    /// Parses a config document; blank input yields the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = if json.trim().is_empty() {
            Self::default()
        } else {
            serde_json::from_str(json).map_err(ConfigError::Parse)?
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        for (index, name) in self.order.iter().enumerate() {
            if self.order[..index].contains(name) {
                return Err(ConfigError::DuplicateSection(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    /// Class for a composer-owned element, e.g. `h5p-question-feedback`.
    pub fn class(&self, suffix: &str) -> String {
        format!("{}-{}", self.class_prefix, suffix)
    }

    /// Resolves an image path against the configured content location.
    pub fn resolve_path(&self, path: &str) -> String {
        if path.contains("://") || path.starts_with('/') || path.starts_with("data:") {
            return path.to_string();
        }

        let mut resolved = String::new();
        if let Some(base) = &self.base_path {
            resolved.push_str(base.trim_end_matches('/'));
            resolved.push('/');
        }
        if let Some(content_id) = &self.content_id {
            resolved.push_str("content/");
            resolved.push_str(content_id);
            resolved.push('/');
        }
        resolved.push_str(path);
        resolved
    }
}

/// JSON schema describing [`QuestionConfig`].
pub fn config_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(QuestionConfig)).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_config_uses_defaults() {
        let config = QuestionConfig::from_json("  ").expect("defaults");
        assert_eq!(config, QuestionConfig::default());
        assert_eq!(config.transition(), Duration::from_millis(150));
        assert_eq!(config.class("buttons"), "h5p-question-buttons");
    }

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let config =
            QuestionConfig::from_json(r#"{"order": ["content", "buttons"], "transition_ms": 40}"#)
                .expect("config");
        assert_eq!(
            config.order,
            vec![SectionName::Content, SectionName::Buttons]
        );
        assert_eq!(config.transition_ms, 40);
        assert_eq!(config.class_prefix, "h5p-question");
    }

    #[test]
    fn duplicate_sections_are_rejected() {
        let err = QuestionConfig::from_json(r#"{"order": ["content", "content"]}"#)
            .expect_err("duplicate");
        assert!(matches!(err, ConfigError::DuplicateSection(name) if name == "content"));
    }

    #[test]
    fn malformed_config_reports_parse_error() {
        let err = QuestionConfig::from_json("{").expect_err("parse");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn relative_paths_join_content_location() {
        let config = QuestionConfig {
            base_path: Some("/h5p/".into()),
            content_id: Some("42".into()),
            ..QuestionConfig::default()
        };
        assert_eq!(
            config.resolve_path("images/cat.png"),
            "/h5p/content/42/images/cat.png"
        );
        assert_eq!(
            config.resolve_path("https://cdn.example/cat.png"),
            "https://cdn.example/cat.png"
        );
        assert_eq!(
            QuestionConfig::default().resolve_path("cat.png"),
            "cat.png"
        );
    }

    #[test]
    fn schema_lists_config_properties() {
        let schema = config_schema();
        let props = schema["properties"].as_object().expect("properties");
        assert!(props.contains_key("order"));
        assert!(props.contains_key("transition_ms"));
    }
}
