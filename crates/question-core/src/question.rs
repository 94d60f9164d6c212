use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::button::{ButtonRegistry, ButtonState};
use crate::config::QuestionConfig;
use crate::events::{Emitter, EventDispatcher, Handler, QuestionEvent, SubscriptionId};
use crate::feedback::{self, FeedbackPanel, FeedbackState};
use crate::height::set_element_height;
use crate::image::{self, ImageParts, ImageZoom};
use crate::insert::insert;
use crate::section::{Content, ContentOptions, SectionName, SectionRegistry};
use crate::toggle::{self, ToggleQueue};
use crate::toolkit::{ButtonConfig, NodeId, TaskQueue, Toolkit, WidgetFactory};

/// Optional hook letting a question type register its sections right before
/// the first layout.
pub trait DomSetup {
    fn register_dom_elements(&self, question: &Question);
}

pub(crate) struct Shared {
    pub(crate) kind: String,
    pub(crate) config: QuestionConfig,
    pub(crate) toolkit: Rc<dyn Toolkit>,
    pub(crate) tasks: Rc<dyn TaskQueue>,
    pub(crate) widgets: Rc<dyn WidgetFactory>,
    pub(crate) events: EventDispatcher,
    pub(crate) setup: RefCell<Option<Rc<dyn DomSetup>>>,
    pub(crate) state: RefCell<State>,
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) order: Vec<SectionName>,
    pub(crate) sections: SectionRegistry,
    pub(crate) buttons: ButtonRegistry,
    pub(crate) toggles: ToggleQueue,
    pub(crate) feedback: FeedbackPanel,
    pub(crate) image: Option<ImageParts>,
    pub(crate) zoom: ImageZoom,
    pub(crate) wrapper: Option<NodeId>,
}

/// Composer of a sectioned question widget.
///
/// Cloning yields another handle to the same question.
#[derive(Clone)]
pub struct Question {
    shared: Rc<Shared>,
}

impl Question {
    pub fn new(
        kind: impl Into<String>,
        config: QuestionConfig,
        toolkit: Rc<dyn Toolkit>,
        tasks: Rc<dyn TaskQueue>,
        widgets: Rc<dyn WidgetFactory>,
    ) -> Self {
        let state = State {
            order: config.order.clone(),
            ..State::default()
        };
        Self {
            shared: Rc::new(Shared {
                kind: kind.into(),
                config,
                toolkit,
                tasks,
                widgets,
                events: EventDispatcher::default(),
                setup: RefCell::new(None),
                state: RefCell::new(state),
            }),
        }
    }

    /// Handle that does not keep the question alive, for callbacks stored
    /// inside the toolkit.
    pub fn downgrade(&self) -> WeakQuestion {
        WeakQuestion {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn with_setup(self, setup: impl DomSetup + 'static) -> Self {
        self.set_setup(Rc::new(setup));
        self
    }

    pub fn set_setup(&self, setup: Rc<dyn DomSetup>) {
        *self.shared.setup.borrow_mut() = Some(setup);
    }

    pub fn kind(&self) -> &str {
        &self.shared.kind
    }

    pub fn config(&self) -> &QuestionConfig {
        &self.shared.config
    }

    /// Declared section order.
    pub fn order(&self) -> Vec<SectionName> {
        self.shared.state.borrow().order.clone()
    }

    pub fn set_order(&self, order: Vec<SectionName>) {
        self.shared.state.borrow_mut().order = order;
    }

    /// Adds the question image; `path` is resolved against the content location.
    pub fn set_image(&self, path: &str, alt: Option<&str>) {
        let mut state = self.shared.state.borrow_mut();
        image::set_image(&self.shared, &mut state, path, alt);
        self.place_section(&state, &SectionName::Image);
    }

    pub fn set_introduction(&self, content: impl Into<Content>) {
        self.set_section(SectionName::Introduction, content.into());
    }

    pub fn set_content(&self, content: impl Into<Content>, options: ContentOptions) {
        let node = self.set_section(SectionName::Content, content.into());
        if let Some(class) = options.class {
            self.shared.toolkit.add_class(node, &class);
        }
    }

    /// Registers or replaces any section, including custom ones.
    pub fn set_section(&self, name: SectionName, content: Content) -> NodeId {
        let mut state = self.shared.state.borrow_mut();
        let node = state.sections.register(
            self.shared.toolkit.as_ref(),
            &self.shared.config,
            name.clone(),
            Some(content),
        );
        self.place_section(&state, &name);
        node
    }

    /// Shows feedback with a score; `None` or blank content hides the panel.
    pub fn set_feedback(&self, content: Option<Content>, score: u32, max_score: u32) {
        let mut state = self.shared.state.borrow_mut();
        feedback::set_feedback(&self.shared, &mut state, content, score, max_score);
    }

    pub fn has_button(&self, id: &str) -> bool {
        self.shared.state.borrow().buttons.contains(id)
    }

    /// Registers a button; registering an existing id does nothing.
    pub fn add_button(&self, id: &str, label: &str, on_click: impl Fn() + 'static, visible: bool) {
        let mut state = self.shared.state.borrow_mut();
        if state.buttons.contains(id) {
            trace!(id, "button already registered");
            return;
        }

        let toolkit = self.shared.toolkit.as_ref();
        let config = &self.shared.config;
        let group = state
            .sections
            .register(toolkit, config, SectionName::Buttons, None);
        self.place_section(&state, &SectionName::Buttons);

        let node = self.shared.widgets.create_button(ButtonConfig {
            class: config.class(id),
            label: label.to_string(),
            on_click: Rc::new(on_click),
        });
        state.buttons.register(id, label, node);
        debug!(id, visible, "button registered");

        if visible {
            insert(
                toolkit,
                state.buttons.order(),
                &id.to_string(),
                |candidate| state.buttons.node(candidate),
                group,
            );
            toolkit.add_class(group, &config.class("visible"));
            set_element_height(toolkit, group);
        }
    }

    pub fn show_button(&self, id: &str) {
        let mut state = self.shared.state.borrow_mut();
        toggle::show_button(&self.shared, &mut state, id);
    }

    pub fn hide_button(&self, id: &str) {
        let mut state = self.shared.state.borrow_mut();
        toggle::hide_button(&self.shared, &mut state, id);
    }

    /// Focuses `id` when visible; without an id, the first button not about
    /// to be hidden.
    pub fn focus_button(&self, id: Option<&str>) {
        let state = self.shared.state.borrow();
        toggle::focus_button(self.shared.toolkit.as_ref(), &state, id);
    }

    pub fn button(&self, id: &str) -> Option<NodeId> {
        self.shared.state.borrow().buttons.node(id)
    }

    pub fn button_state(&self, id: &str) -> Option<ButtonState> {
        let state = self.shared.state.borrow();
        toggle::button_state(self.shared.toolkit.as_ref(), &state, id)
    }

    pub fn button_ids(&self) -> Vec<String> {
        self.shared.state.borrow().buttons.order().to_vec()
    }

    pub fn feedback_state(&self) -> FeedbackState {
        let state = self.shared.state.borrow();
        feedback::feedback_state(self.shared.toolkit.as_ref(), &state)
    }

    pub fn image_zoom(&self) -> ImageZoom {
        self.shared.state.borrow().zoom
    }

    pub fn toggle_image_zoom(&self) {
        image::toggle_zoom(&self.shared);
    }

    pub fn section(&self, name: &SectionName) -> Option<NodeId> {
        self.shared.state.borrow().sections.node(name)
    }

    pub fn has_section(&self, name: &SectionName) -> bool {
        self.shared.state.borrow().sections.exists(name)
    }

    pub fn section_content(&self, name: &SectionName) -> Option<Content> {
        self.shared.state.borrow().sections.get(name).cloned()
    }

    /// Container of the last attach.
    pub fn container(&self) -> Option<NodeId> {
        self.shared.state.borrow().wrapper
    }

    /// Lays out every registered section into `container` in declared order.
    ///
    /// The setup hook and the `RegisterDomElements` event run on the first
    /// attach only, before the layout.
    pub fn attach(&self, container: NodeId) {
        let first = self.shared.state.borrow().wrapper.is_none();
        if first {
            let setup = self.shared.setup.borrow().clone();
            if let Some(setup) = setup {
                setup.register_dom_elements(self);
            }
            self.shared.events.emit(&QuestionEvent::RegisterDomElements);
        }

        let mut state = self.shared.state.borrow_mut();
        let toolkit = self.shared.toolkit.as_ref();
        state.wrapper = Some(container);
        toolkit.clear(container);
        toolkit.add_class(container, &self.shared.config.class_prefix);
        toolkit.add_class(container, &format!("h5p-{}", self.shared.kind));

        let showing = state.feedback.is_showing();
        for name in &state.order {
            if *name == SectionName::Feedback && !showing {
                continue;
            }
            if let Some(node) = state.sections.node(name) {
                toolkit.append(container, node);
            }
        }
        debug!(kind = %self.shared.kind, first, "question attached");

        if showing {
            feedback::reveal_next_turn(&self.shared);
        }
    }

    /// Places a section registered after attaching.
    fn place_section(&self, state: &State, name: &SectionName) {
        let Some(wrapper) = state.wrapper else {
            return;
        };
        let Some(node) = state.sections.node(name) else {
            return;
        };
        if self.shared.toolkit.is_visible(node) {
            return;
        }
        insert(
            self.shared.toolkit.as_ref(),
            &state.order,
            name,
            |candidate| state.sections.node(candidate),
            wrapper,
        );
    }
}

#[derive(Clone)]
pub struct WeakQuestion {
    shared: Weak<Shared>,
}

impl WeakQuestion {
    pub fn upgrade(&self) -> Option<Question> {
        self.shared.upgrade().map(|shared| Question { shared })
    }
}

impl Emitter for Question {
    fn subscribe(&self, handler: Handler) -> SubscriptionId {
        self.shared.events.subscribe(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.events.unsubscribe(id)
    }

    fn emit(&self, event: &QuestionEvent) {
        self.shared.events.emit(event);
    }
}
