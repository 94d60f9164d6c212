#![allow(missing_docs)]

pub mod button;
pub mod config;
pub mod events;
pub mod feedback;
pub mod height;
pub mod image;
pub mod insert;
pub mod question;
pub mod section;
pub mod toggle;
pub mod toolkit;

pub use button::{ButtonRegistry, ButtonState};
pub use config::{ConfigError, QuestionConfig, config_schema};
pub use events::{Emitter, EventDispatcher, Handler, QuestionEvent, SubscriptionId};
pub use feedback::FeedbackState;
pub use height::{collapse, natural_height, set_element_height};
pub use image::ImageZoom;
pub use insert::insert;
pub use question::{DomSetup, Question, WeakQuestion};
pub use section::{Content, ContentOptions, SectionName, SectionRegistry};
pub use toggle::ToggleQueue;
pub use toolkit::{
    ButtonConfig, DomEvent, EventKind, Listener, NodeId, ScoreIndicator, TaskHandle, TaskQueue,
    Toolkit, WidgetFactory,
};
