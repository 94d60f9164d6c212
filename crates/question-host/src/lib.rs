pub mod event_loop;
pub mod memory;
pub mod scenario;
pub mod widgets;

use std::rc::Rc;

use question_core::{ConfigError, Question, QuestionConfig};
use serde_json::{Value, json};
use thiserror::Error;

pub use event_loop::VirtualLoop;
pub use memory::{ElementSnapshot, MemoryDom, Mutation};
pub use scenario::{Scenario, ScenarioReport, Script, Step};
pub use widgets::{BUTTON_HEIGHT, MemoryWidgets};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to parse script: {0}")]
    ScriptParse(#[source] serde_json::Error),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("button '{0}' is not registered")]
    UnknownButton(String),
    #[error("step {0} needs an image but none was set")]
    NoImage(usize),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

/// In-memory element tree, event loop and widget factory sharing one host.
#[derive(Clone)]
pub struct Host {
    pub dom: Rc<MemoryDom>,
    pub tasks: Rc<VirtualLoop>,
    pub widgets: Rc<MemoryWidgets>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    pub fn new() -> Self {
        let dom = Rc::new(MemoryDom::new());
        Self {
            widgets: Rc::new(MemoryWidgets::new(dom.clone())),
            tasks: Rc::new(VirtualLoop::new()),
            dom,
        }
    }

    pub fn question(&self, kind: &str, config: QuestionConfig) -> Question {
        Question::new(
            kind,
            config,
            self.dom.clone(),
            self.tasks.clone(),
            self.widgets.clone(),
        )
    }
}

/// Parses `config_json` and `script_json`, then runs every step on a fresh host.
///
/// A blank config selects the defaults.
pub fn run_scenario(script_json: &str, config_json: &str) -> Result<Scenario, HostError> {
    let config = QuestionConfig::from_json(config_json)?;
    let script: Script = serde_json::from_str(script_json).map_err(HostError::ScriptParse)?;

    let scenario = Scenario::new(&script.kind, config);
    for (selector, height) in &script.max_heights {
        scenario.host().dom.add_max_height_rule(selector, *height);
    }
    scenario.run(&script.steps)?;
    Ok(scenario)
}

fn respond(result: Result<Value, HostError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, HostError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

/// Runs a script and returns the [`ScenarioReport`] as JSON.
pub fn run_script(script_json: &str, config_json: &str) -> String {
    respond(run_scenario(script_json, config_json).and_then(|scenario| {
        serde_json::to_value(scenario.report()).map_err(HostError::JsonEncode)
    }))
}

/// Runs a script and returns the element outline plus composer state.
pub fn run_script_text(script_json: &str, config_json: &str) -> String {
    respond_string(run_scenario(script_json, config_json).map(|scenario| scenario.render_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../tests/fixtures/check_retry.json");

    #[test]
    fn run_script_reports_tree_and_states() {
        let response = run_script(FIXTURE, "");
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["kind"], "multichoice");
        assert_eq!(parsed["buttons"]["check"], "detached");
        assert_eq!(parsed["buttons"]["retry"], "visible");
        assert_eq!(parsed["feedback"], "visible");
        assert_eq!(parsed["clicks"][0], "check");
        assert_eq!(parsed["tree"]["classes"][0], "h5p-question");
    }

    #[test]
    fn run_script_text_outlines_sections() {
        let output = run_script_text(FIXTURE, "");
        assert!(output.contains("div.h5p-question-content"));
        assert!(output.contains("Button retry: visible"));
        assert!(output.contains("Feedback: visible"));
    }

    #[test]
    fn malformed_script_returns_error_payload() {
        let response = run_script("{", "");
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert!(
            parsed["error"]
                .as_str()
                .unwrap_or_default()
                .starts_with("failed to parse script")
        );
    }

    #[test]
    fn clicking_unknown_button_is_reported() {
        let script = json!({
            "steps": [{ "op": "click_button", "id": "missing" }]
        });
        let response = run_script(&script.to_string(), "");
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["error"], "button 'missing' is not registered");
    }

    #[test]
    fn invalid_config_is_reported() {
        let response = run_script(FIXTURE, r#"{"order": ["content", "content"]}"#);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert!(
            parsed["error"]
                .as_str()
                .unwrap_or_default()
                .starts_with("invalid config")
        );
    }
}
