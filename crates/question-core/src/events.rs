use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::Serialize;

/// Notifications emitted by a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QuestionEvent {
    /// Fired once, on the first attach, right after the setup hook.
    RegisterDomElements,
    /// The question image finished loading.
    ImageLoaded { width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Handler = Rc<dyn Fn(&QuestionEvent)>;

/// Subscribe/emit capability.
pub trait Emitter {
    fn subscribe(&self, handler: Handler) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
    fn emit(&self, event: &QuestionEvent);
}

/// Listener list behind [`Emitter`].
#[derive(Default)]
pub struct EventDispatcher {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(SubscriptionId, Handler)>>,
}

impl Emitter for EventDispatcher {
    fn subscribe(&self, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(candidate, _)| *candidate != id);
        handlers.len() != before
    }

    fn emit(&self, event: &QuestionEvent) {
        // Handlers may subscribe while being notified.
        let handlers: Vec<Handler> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reaches_current_subscribers_only() {
        let dispatcher = EventDispatcher::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        let first = dispatcher.subscribe(Rc::new(move |event: &QuestionEvent| {
            sink.borrow_mut().push(event.clone())
        }));
        dispatcher.emit(&QuestionEvent::RegisterDomElements);

        assert!(dispatcher.unsubscribe(first));
        assert!(!dispatcher.unsubscribe(first));
        dispatcher.emit(&QuestionEvent::ImageLoaded {
            width: 10.0,
            height: 20.0,
        });

        assert_eq!(*seen.borrow(), vec![QuestionEvent::RegisterDomElements]);
    }
}
