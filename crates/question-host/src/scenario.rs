use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use question_core::{
    ButtonState, Content, ContentOptions, Emitter, FeedbackState, ImageZoom, NodeId, Question,
    QuestionConfig, QuestionEvent, SectionName, Toolkit,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::memory::ElementSnapshot;
use crate::{Host, HostError};

fn default_kind() -> String {
    "question".into()
}

fn default_true() -> bool {
    true
}

/// Scripted sequence of host and composer operations.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default = "default_kind")]
    pub kind: String,
    /// `max-height` rules applied to the in-memory stylesheet.
    #[serde(default)]
    pub max_heights: BTreeMap<String, f64>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    SetImage {
        path: String,
        #[serde(default)]
        alt: Option<String>,
    },
    SetIntroduction {
        html: String,
    },
    SetContent {
        html: String,
        #[serde(default)]
        class: Option<String>,
    },
    SetFeedback {
        #[serde(default)]
        html: Option<String>,
        #[serde(default)]
        score: u32,
        #[serde(default)]
        max_score: u32,
    },
    AddButton {
        id: String,
        label: String,
        #[serde(default = "default_true")]
        visible: bool,
        /// Buttons hidden when this one is clicked.
        #[serde(default)]
        hides: Vec<String>,
        /// Buttons shown when this one is clicked.
        #[serde(default)]
        shows: Vec<String>,
    },
    ShowButton {
        id: String,
    },
    HideButton {
        id: String,
    },
    FocusButton {
        #[serde(default)]
        id: Option<String>,
    },
    ClickButton {
        id: String,
    },
    Attach,
    LoadImage {
        width: f64,
        height: f64,
    },
    ClickImage,
    /// Runs one scheduling turn.
    Turn,
    Advance {
        ms: u64,
    },
    /// Runs the clock past every running transition.
    Settle,
}

/// Observable outcome of a script.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub kind: String,
    pub tree: ElementSnapshot,
    pub events: Vec<QuestionEvent>,
    pub clicks: Vec<String>,
    pub focused: Option<String>,
    pub buttons: BTreeMap<String, ButtonState>,
    pub feedback: FeedbackState,
    pub image: ImageZoom,
    pub elapsed_ms: u64,
}

/// A question mounted on an in-memory host, driven step by step.
pub struct Scenario {
    host: Host,
    question: Question,
    container: NodeId,
    events: Rc<RefCell<Vec<QuestionEvent>>>,
    clicks: Rc<RefCell<Vec<String>>>,
}

impl Scenario {
    pub fn new(kind: &str, config: QuestionConfig) -> Self {
        let host = Host::new();
        let question = host.question(kind, config);
        let container = host.dom.create_container();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        question.subscribe(Rc::new(move |event: &QuestionEvent| {
            sink.borrow_mut().push(event.clone())
        }));

        Self {
            host,
            question,
            container,
            events,
            clicks: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn run(&self, steps: &[Step]) -> Result<(), HostError> {
        for (index, step) in steps.iter().enumerate() {
            debug!(index, ?step, "running step");
            self.apply(index, step)?;
        }
        Ok(())
    }

    fn apply(&self, index: usize, step: &Step) -> Result<(), HostError> {
        let question = &self.question;
        match step {
            Step::SetImage { path, alt } => question.set_image(path, alt.as_deref()),
            Step::SetIntroduction { html } => question.set_introduction(html.as_str()),
            Step::SetContent { html, class } => question.set_content(
                html.as_str(),
                ContentOptions {
                    class: class.clone(),
                },
            ),
            Step::SetFeedback {
                html,
                score,
                max_score,
            } => question.set_feedback(html.clone().map(Content::Html), *score, *max_score),
            Step::AddButton {
                id,
                label,
                visible,
                hides,
                shows,
            } => self.add_button(id, label, *visible, hides.clone(), shows.clone()),
            Step::ShowButton { id } => question.show_button(id),
            Step::HideButton { id } => question.hide_button(id),
            Step::FocusButton { id } => question.focus_button(id.as_deref()),
            Step::ClickButton { id } => {
                let node = question
                    .button(id)
                    .ok_or_else(|| HostError::UnknownButton(id.clone()))?;
                self.host.dom.click(node);
            }
            Step::Attach => question.attach(self.container),
            Step::LoadImage { width, height } => {
                let img = self.image_element(index)?;
                self.host.dom.load_image(img, *width, *height);
            }
            Step::ClickImage => {
                let img = self.image_element(index)?;
                if let Some(wrap) = self.host.dom.parent(img) {
                    self.host.dom.click(wrap);
                }
            }
            Step::Turn => {
                self.host.tasks.turn();
            }
            Step::Advance { ms } => {
                self.host.tasks.advance(Duration::from_millis(*ms));
            }
            Step::Settle => {
                self.host
                    .tasks
                    .advance(question.config().transition());
            }
        }
        Ok(())
    }

    fn add_button(
        &self,
        id: &str,
        label: &str,
        visible: bool,
        hides: Vec<String>,
        shows: Vec<String>,
    ) {
        let clicks = self.clicks.clone();
        let weak = self.question.downgrade();
        let button_id = id.to_string();
        self.question.add_button(
            id,
            label,
            move || {
                clicks.borrow_mut().push(button_id.clone());
                let Some(question) = weak.upgrade() else {
                    return;
                };
                for id in &hides {
                    question.hide_button(id);
                }
                for id in &shows {
                    question.show_button(id);
                }
            },
            visible,
        );
    }

    fn image_element(&self, index: usize) -> Result<NodeId, HostError> {
        self.question
            .section(&SectionName::Image)
            .and_then(|section| self.host.dom.find_by_tag(section, "img"))
            .ok_or(HostError::NoImage(index))
    }

    pub fn report(&self) -> ScenarioReport {
        let question = &self.question;
        let focused = self.host.dom.focused();
        let ids = question.button_ids();

        ScenarioReport {
            kind: question.kind().to_string(),
            tree: self.host.dom.snapshot(self.container),
            events: self.events.borrow().clone(),
            clicks: self.clicks.borrow().clone(),
            focused: ids
                .iter()
                .find(|id| focused.is_some() && question.button(id) == focused)
                .cloned(),
            buttons: ids
                .iter()
                .filter_map(|id| question.button_state(id).map(|state| (id.clone(), state)))
                .collect(),
            feedback: question.feedback_state(),
            image: question.image_zoom(),
            elapsed_ms: self.host.tasks.now().as_millis() as u64,
        }
    }

    /// Indented element tree followed by the composer state.
    pub fn render_text(&self) -> String {
        let report = self.report();
        let mut lines = vec![self.host.dom.outline(self.container)];
        lines.push(format!("Elapsed: {}ms", report.elapsed_ms));
        for (id, state) in &report.buttons {
            lines.push(format!("Button {id}: {}", state_label(state)));
        }
        lines.push(format!("Feedback: {}", state_label(&report.feedback)));
        lines.push(format!("Image: {}", state_label(&report.image)));
        if let Some(focused) = &report.focused {
            lines.push(format!("Focused: {focused}"));
        }
        if !report.clicks.is_empty() {
            lines.push(format!("Clicks: {}", report.clicks.join(", ")));
        }
        lines.join("\n")
    }
}

fn state_label<T: Serialize>(state: &T) -> String {
    serde_json::to_value(state)
        .ok()
        .and_then(|value| value.as_str().map(String::from))
        .unwrap_or_default()
}
