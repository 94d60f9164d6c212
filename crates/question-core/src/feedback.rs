use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::height::{collapse, set_element_height};
use crate::insert::insert;
use crate::question::{Shared, State};
use crate::section::{Content, SectionName};
use crate::toolkit::{ScoreIndicator, Toolkit};

/// Lifecycle of the feedback panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackState {
    Absent,
    Visible,
    /// Closing transition running; detached once it elapses.
    Hiding,
}

/// Score indicator plus the intended visibility of the panel.
///
/// `showing` is checked by every deferred step, which is what keeps a stale
/// detach from removing a panel that was shown again in the meantime.
#[derive(Default)]
pub struct FeedbackPanel {
    indicator: Option<Box<dyn ScoreIndicator>>,
    showing: bool,
}

impl FeedbackPanel {
    pub fn is_showing(&self) -> bool {
        self.showing
    }
}

pub(crate) fn set_feedback(
    shared: &Rc<Shared>,
    state: &mut State,
    content: Option<Content>,
    score: u32,
    max_score: u32,
) {
    match content.filter(|content| !content.is_empty()) {
        Some(content) => show(shared, state, content, score, max_score),
        None if state.feedback.showing => hide(shared, state),
        None => {}
    }
}

fn show(shared: &Rc<Shared>, state: &mut State, content: Content, score: u32, max_score: u32) {
    let toolkit = shared.toolkit.as_ref();
    let config = &shared.config;

    let container = toolkit.create_element("div", &config.class("feedback-container"));
    let indicator = state
        .feedback
        .indicator
        .get_or_insert_with(|| shared.widgets.create_score_indicator(max_score));
    indicator.attach_to(container);
    indicator.set_score(score);

    let body = toolkit.create_element("div", &config.class("feedback-content"));
    match content {
        Content::Html(html) => toolkit.set_html(body, &html),
        Content::Node(node) => toolkit.append(body, node),
    }
    toolkit.append(container, body);

    state.feedback.showing = true;
    let panel = state.sections.register(
        toolkit,
        config,
        SectionName::Feedback,
        Some(Content::Node(container)),
    );
    debug!(score, max_score, "feedback shown");

    if let Some(wrapper) = state.wrapper {
        if !toolkit.is_visible(panel) {
            insert(
                toolkit,
                &state.order,
                &SectionName::Feedback,
                |name| state.sections.node(name),
                wrapper,
            );
        }
        reveal_next_turn(shared);
    }
}

fn hide(shared: &Rc<Shared>, state: &mut State) {
    let Some(panel) = state.sections.node(&SectionName::Feedback) else {
        return;
    };
    let toolkit = shared.toolkit.as_ref();
    state.feedback.showing = false;
    toolkit.remove_class(panel, &shared.config.class("visible"));
    collapse(toolkit, panel);
    debug!("feedback hiding");

    let weak = Rc::downgrade(shared);
    shared.tasks.defer(
        shared.config.transition(),
        Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let state = shared.state.borrow();
            if !state.feedback.showing {
                shared.toolkit.detach(panel);
                debug!("feedback detached");
            }
        }),
    );
}

/// Opens the panel once it is in the tree and measurable.
pub(crate) fn reveal_next_turn(shared: &Rc<Shared>) {
    let weak = Rc::downgrade(shared);
    shared.tasks.defer(
        Duration::ZERO,
        Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let state = shared.state.borrow();
            if !state.feedback.showing {
                return;
            }
            if let Some(panel) = state.sections.node(&SectionName::Feedback) {
                shared
                    .toolkit
                    .add_class(panel, &shared.config.class("visible"));
                set_element_height(shared.toolkit.as_ref(), panel);
            }
        }),
    );
}

pub(crate) fn feedback_state(toolkit: &dyn Toolkit, state: &State) -> FeedbackState {
    let Some(panel) = state.sections.node(&SectionName::Feedback) else {
        return FeedbackState::Absent;
    };
    if state.feedback.showing {
        FeedbackState::Visible
    } else if toolkit.parent(panel).is_some() {
        FeedbackState::Hiding
    } else {
        FeedbackState::Absent
    }
}
