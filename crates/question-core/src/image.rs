use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::events::{Emitter, QuestionEvent};
use crate::height::{MAX_HEIGHT, natural_height, px};
use crate::question::{Shared, State};
use crate::section::{Content, SectionName};
use crate::toolkit::{DomEvent, EventKind, NodeId};

/// Zoom state of the question image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageZoom {
    #[default]
    Thumbnail,
    /// Natural height measured, applied on the next turn.
    Enlarging,
    Enlarged,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageParts {
    pub(crate) img: NodeId,
    pub(crate) wrap: NodeId,
    scalable: bool,
}

const PRIMARY_BUTTON: u16 = 1;
const ACTIVATION_KEY: char = ' ';

pub(crate) fn set_image(shared: &Rc<Shared>, state: &mut State, path: &str, alt: Option<&str>) {
    let toolkit = shared.toolkit.as_ref();
    let config = &shared.config;

    let wrap = toolkit.create_element("div", &config.class("image-wrap"));
    let img = toolkit.create_element("img", "");
    toolkit.set_attribute(img, "src", &config.resolve_path(path));
    toolkit.set_attribute(img, "alt", alt.unwrap_or_default());
    toolkit.append(wrap, img);

    // Replaces any earlier image, keeping the section element.
    let section = state.sections.register(
        toolkit,
        config,
        SectionName::Image,
        Some(Content::Node(wrap)),
    );
    toolkit.remove_class(section, &config.class("image-large"));

    state.image = Some(ImageParts {
        img,
        wrap,
        scalable: false,
    });
    state.zoom = ImageZoom::Thumbnail;

    let weak = Rc::downgrade(shared);
    toolkit.listen(
        img,
        EventKind::Load,
        Rc::new(move |event: &DomEvent| {
            if let DomEvent::Load { width, height } = *event
                && let Some(shared) = weak.upgrade()
            {
                image_loaded(&shared, img, width, height);
            }
        }),
    );
}

fn image_loaded(shared: &Rc<Shared>, img: NodeId, width: f64, height: f64) {
    {
        let mut state = shared.state.borrow_mut();
        let Some(parts) = state.image.as_mut().filter(|parts| parts.img == img) else {
            return;
        };
        let toolkit = shared.toolkit.as_ref();

        let (natural, thumbnail) = if toolkit.is_visible(img) {
            toolkit.set_style(img, MAX_HEIGHT, Some("none"));
            let natural = toolkit.height(img);
            toolkit.set_style(img, MAX_HEIGHT, None);
            (natural, toolkit.height(img))
        } else {
            (height, height)
        };

        if natural > thumbnail && !parts.scalable {
            parts.scalable = true;
            let wrap = parts.wrap;
            toolkit.set_attribute(img, "role", "button");
            toolkit.set_attribute(img, "tabindex", "0");
            toolkit.add_class(wrap, &shared.config.class("image-scalable"));

            let weak = Rc::downgrade(shared);
            toolkit.listen(
                wrap,
                EventKind::Click,
                Rc::new(move |event: &DomEvent| {
                    if matches!(event, DomEvent::Click { button } if *button == PRIMARY_BUTTON)
                        && let Some(shared) = weak.upgrade()
                    {
                        toggle_zoom(&shared);
                    }
                }),
            );
            let weak = Rc::downgrade(shared);
            toolkit.listen(
                wrap,
                EventKind::KeyPress,
                Rc::new(move |event: &DomEvent| {
                    if matches!(event, DomEvent::KeyPress { key } if *key == ACTIVATION_KEY)
                        && let Some(shared) = weak.upgrade()
                    {
                        toggle_zoom(&shared);
                    }
                }),
            );
            debug!(natural, thumbnail, "image zoom enabled");
        }
    }

    shared
        .events
        .emit(&QuestionEvent::ImageLoaded { width, height });
}

/// Switches between thumbnail and enlarged image.
pub(crate) fn toggle_zoom(shared: &Rc<Shared>) {
    let mut state = shared.state.borrow_mut();
    let Some(parts) = state.image else {
        return;
    };
    let Some(section) = state.sections.node(&SectionName::Image) else {
        return;
    };
    let toolkit = shared.toolkit.as_ref();
    let large_class = shared.config.class("image-large");

    match state.zoom {
        ImageZoom::Thumbnail => {
            let target = natural_height(toolkit, parts.img);
            state.zoom = ImageZoom::Enlarging;
            debug!(target, "enlarging image");

            let weak = Rc::downgrade(shared);
            shared.tasks.defer(
                Duration::ZERO,
                Box::new(move || {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let mut state = shared.state.borrow_mut();
                    if state.zoom != ImageZoom::Enlarging {
                        return;
                    }
                    shared
                        .toolkit
                        .set_style(parts.img, MAX_HEIGHT, Some(&px(target)));
                    shared.toolkit.add_class(section, &large_class);
                    state.zoom = ImageZoom::Enlarged;
                }),
            );
        }
        ImageZoom::Enlarging | ImageZoom::Enlarged => {
            toolkit.remove_class(section, &large_class);
            toolkit.set_style(parts.img, MAX_HEIGHT, None);
            state.zoom = ImageZoom::Thumbnail;
            debug!("image restored to thumbnail");
        }
    }
}
