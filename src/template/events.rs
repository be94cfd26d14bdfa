//! Synchronous event emitter used for lifecycle events and data-source binding

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// Emitted after a data source is connected
pub const CONNECTED: &str = "connected";
/// Emitted before the data source is released
pub const BEFORE_DISCONNECT: &str = "before_disconnect";
/// Emitted after the data source is released
pub const DISCONNECTED: &str = "disconnected";
/// Emitted after a redraw rendered new content, before it is swapped in
pub const RE_DRAW: &str = "re-draw";
/// Emitted after new content replaced the element; payload is the content
pub const DRAWN: &str = "drawn";

/// One emitted event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub payload: Option<Value>,
}

pub type Handler = Rc<dyn Fn(&Event)>;

/// Handle returned by a subscription, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Something that can be watched for events
pub trait Observable {
    /// Receive every event emitted from now on
    fn subscribe(&self, handler: Handler) -> ListenerId;

    /// Remove a subscription; false if `id` was not subscribed
    fn unsubscribe(&self, id: ListenerId) -> bool;
}

struct Listener {
    id: ListenerId,
    /// `None` listens to every event
    event: Option<String>,
    handler: Handler,
}

/// Single-threaded emitter; handlers run synchronously in registration order
#[derive(Default)]
pub struct EventEmitter {
    listeners: RefCell<Vec<Listener>>,
    next_id: Cell<u64>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to one named event
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        self.add(Some(event.into()), Rc::new(handler))
    }

    /// Listen to every event
    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        self.add(None, Rc::new(handler))
    }

    /// Remove a listener
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Invoke the matching handlers and return how many ran.
    ///
    /// Handlers may add or remove listeners; the change applies from the
    /// next emit on.
    pub fn emit(&self, name: &str, payload: Option<Value>) -> usize {
        let handlers: Vec<Handler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.event.as_deref().map_or(true, |event| event == name))
            .map(|l| Rc::clone(&l.handler))
            .collect();

        let event = Event {
            name: name.to_string(),
            payload,
        };
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn add(&self, event: Option<String>, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push(Listener { id, event, handler });
        id
    }
}

impl Observable for EventEmitter {
    fn subscribe(&self, handler: Handler) -> ListenerId {
        self.add(None, handler)
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        self.off(id)
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&Event)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let make = move |tag: &str| -> Box<dyn Fn(&Event)> {
            let sink = Rc::clone(&sink);
            let tag = tag.to_string();
            Box::new(move |event: &Event| sink.borrow_mut().push(format!("{}:{}", tag, event.name)))
        };
        (log, make)
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let emitter = EventEmitter::new();
        let (log, make) = recorder();

        emitter.on("ping", make("first"));
        emitter.on_any(make("any"));
        emitter.on("ping", make("second"));
        emitter.on("pong", make("other"));

        assert_eq!(emitter.emit("ping", None), 3);
        assert_eq!(*log.borrow(), vec!["first:ping", "any:ping", "second:ping"]);
    }

    #[test]
    fn test_off_removes_only_that_listener() {
        let emitter = EventEmitter::new();
        let (log, make) = recorder();

        let a = emitter.on("x", make("a"));
        emitter.on("x", make("b"));

        assert!(emitter.off(a));
        assert!(!emitter.off(a));
        emitter.emit("x", None);
        assert_eq!(*log.borrow(), vec!["b:x"]);
    }

    #[test]
    fn test_payload_is_delivered() {
        let emitter = EventEmitter::new();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        emitter.on("drawn", move |event| *sink.borrow_mut() = event.payload.clone());

        emitter.emit("drawn", Some(json!("<p>new</p>")));
        assert_eq!(*seen.borrow(), Some(json!("<p>new</p>")));
    }

    #[test]
    fn test_handler_may_unsubscribe_during_emit() {
        let emitter = Rc::new(EventEmitter::new());
        let id = Rc::new(Cell::new(None));

        let target = Rc::clone(&emitter);
        let own_id = Rc::clone(&id);
        let registered = emitter.on("once", move |_| {
            if let Some(id) = own_id.get() {
                target.off(id);
            }
        });
        id.set(Some(registered));

        assert_eq!(emitter.emit("once", None), 1);
        assert_eq!(emitter.emit("once", None), 0);
    }
}
