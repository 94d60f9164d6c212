use std::rc::Rc;

use question_core::{
    ButtonConfig, DomEvent, EventKind, NodeId, ScoreIndicator, Toolkit, WidgetFactory,
};

use crate::memory::MemoryDom;

pub const BUTTON_HEIGHT: f64 = 32.0;

/// Button and score bar factory drawing into a [`MemoryDom`].
pub struct MemoryWidgets {
    dom: Rc<MemoryDom>,
}

impl MemoryWidgets {
    pub fn new(dom: Rc<MemoryDom>) -> Self {
        Self { dom }
    }
}

impl WidgetFactory for MemoryWidgets {
    fn create_score_indicator(&self, max_score: u32) -> Box<dyn ScoreIndicator> {
        let node = self.dom.create_element("div", "h5p-joubelui-score-bar");
        self.dom
            .set_attribute(node, "aria-valuemax", &max_score.to_string());
        Box::new(ScoreBar {
            dom: self.dom.clone(),
            node,
            max_score,
        })
    }

    fn create_button(&self, config: ButtonConfig) -> NodeId {
        let node = self
            .dom
            .create_element("button", &format!("h5p-joubelui-button {}", config.class));
        self.dom.set_html(node, &config.label);
        self.dom.set_intrinsic_height(node, BUTTON_HEIGHT);
        let on_click = config.on_click;
        self.dom.listen(
            node,
            EventKind::Click,
            Rc::new(move |_: &DomEvent| on_click()),
        );
        node
    }
}

struct ScoreBar {
    dom: Rc<MemoryDom>,
    node: NodeId,
    max_score: u32,
}

impl ScoreIndicator for ScoreBar {
    fn set_score(&self, score: u32) {
        let score = score.min(self.max_score);
        self.dom
            .set_attribute(self.node, "aria-valuenow", &score.to_string());
        self.dom
            .set_html(self.node, &format!("{score}/{}", self.max_score));
    }

    fn attach_to(&self, container: NodeId) {
        self.dom.append(container, self.node);
    }
}
