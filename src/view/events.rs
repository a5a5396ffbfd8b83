//! Events - Named event table attached to every view.
//!
//! Subscriptions are stored in a flat list tagged with an id, the event name
//! and, when made through [`ViewCore::listen_to`](super::ViewCore::listen_to),
//! the id of the listening view. Removal is always a `retain` over that list.
//!
//! # API
//!
//! - `on(names, handler)` - Subscribe to one or more events
//! - `once(names, handler)` - Same, dropped the first time any of the names fires
//! - `off(id)` - Drop a subscription
//! - `off_listener(view_id)` - Drop everything a given view subscribed
//! - `trigger(name, source)` - Call every handler subscribed to `name`
//!
//! `names` is a whitespace separated list, e.g. `"remove dispose"`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::types::ViewId;

// =============================================================================
// TYPES
// =============================================================================

/// Event delivered to handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Name the event was triggered with.
    pub name: String,
    /// View whose event table fired.
    pub source: ViewId,
}

/// Handler for view events.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// Identifies one `on`/`once` call, across all the names it covered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

struct Subscription {
    id: SubscriptionId,
    name: String,
    listener: Option<ViewId>,
    once: bool,
    handler: EventHandler,
}

#[derive(Default)]
struct EventTable {
    subscriptions: Vec<Subscription>,
    next_id: usize,
}

impl EventTable {
    fn next_id(&mut self) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        SubscriptionId(id)
    }
}

// =============================================================================
// EVENTS
// =============================================================================

#[derive(Default)]
pub struct Events {
    table: RefCell<EventTable>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to every event in `names`.
    pub fn on<F>(&self, names: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + 'static,
    {
        self.subscribe(names, None, false, Rc::new(handler))
    }

    /// Subscribe `handler` to every event in `names`; the whole subscription
    /// is dropped the first time any of them fires.
    pub fn once<F>(&self, names: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + 'static,
    {
        self.subscribe(names, None, true, Rc::new(handler))
    }

    pub(crate) fn subscribe(
        &self,
        names: &str,
        listener: Option<ViewId>,
        once: bool,
        handler: EventHandler,
    ) -> SubscriptionId {
        let mut table = self.table.borrow_mut();
        let id = table.next_id();

        let mut seen: Vec<&str> = Vec::new();
        for name in names.split_whitespace() {
            if seen.contains(&name) {
                continue;
            }
            seen.push(name);
            table.subscriptions.push(Subscription {
                id,
                name: name.to_string(),
                listener: listener.clone(),
                once,
                handler: handler.clone(),
            });
        }

        id
    }

    /// Drop a subscription. Returns false if it was already gone.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut table = self.table.borrow_mut();
        let before = table.subscriptions.len();
        table.subscriptions.retain(|s| s.id != id);
        table.subscriptions.len() != before
    }

    /// Drop every subscription to `name`.
    pub fn off_event(&self, name: &str) {
        self.table
            .borrow_mut()
            .subscriptions
            .retain(|s| s.name != name);
    }

    /// Drop every subscription made on behalf of `listener`.
    ///
    /// Returns the number of dropped entries.
    pub fn off_listener(&self, listener: &ViewId) -> usize {
        let mut table = self.table.borrow_mut();
        let before = table.subscriptions.len();
        table
            .subscriptions
            .retain(|s| s.listener.as_ref() != Some(listener));
        before - table.subscriptions.len()
    }

    /// Call every handler subscribed to `name`.
    ///
    /// Handlers are snapshotted before the first one runs, so a handler may
    /// subscribe, unsubscribe or trigger again without affecting this round.
    /// Returns the number of handlers called.
    pub fn trigger(&self, name: &str, source: &ViewId) -> usize {
        let handlers: Vec<EventHandler> = {
            let mut table = self.table.borrow_mut();

            let fired_once: Vec<SubscriptionId> = table
                .subscriptions
                .iter()
                .filter(|s| s.once && s.name == name)
                .map(|s| s.id)
                .collect();

            let handlers = table
                .subscriptions
                .iter()
                .filter(|s| s.name == name)
                .map(|s| s.handler.clone())
                .collect();

            if !fired_once.is_empty() {
                table.subscriptions.retain(|s| !fired_once.contains(&s.id));
            }

            handlers
        };

        let event = Event {
            name: name.to_string(),
            source: source.clone(),
        };
        for handler in &handlers {
            handler(&event);
        }

        handlers.len()
    }

    /// Number of (subscription, name) entries.
    pub fn len(&self) -> usize {
        self.table.borrow().subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `listener` holds at least one subscription here.
    pub fn has_listener(&self, listener: &ViewId) -> bool {
        self.table
            .borrow()
            .subscriptions
            .iter()
            .any(|s| s.listener.as_ref() == Some(listener))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn source() -> ViewId {
        ViewId::new("view0")
    }

    #[test]
    fn test_on_and_off() {
        let events = Events::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();

        let id = events.on("evt", move |_| count_clone.set(count_clone.get() + 1));

        events.trigger("evt", &source());
        events.trigger("other", &source());
        assert_eq!(count.get(), 1);

        assert!(events.off(id));
        assert!(!events.off(id));

        events.trigger("evt", &source());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_event_payload() {
        let events = Events::new();
        let seen = Rc::new(RefCell::new(None));
        let seen_clone = seen.clone();

        events.on("render", move |event| {
            *seen_clone.borrow_mut() = Some(event.clone());
        });
        events.trigger("render", &source());

        let event = seen.borrow().clone().unwrap();
        assert_eq!(event.name, "render");
        assert_eq!(event.source, source());
    }

    #[test]
    fn test_once_covers_all_names() {
        let events = Events::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();

        events.once("remove dispose", move |_| count_clone.set(count_clone.get() + 1));
        assert_eq!(events.len(), 2);

        events.trigger("dispose", &source());
        events.trigger("remove", &source());
        events.trigger("dispose", &source());

        assert_eq!(count.get(), 1);
        assert!(events.is_empty());
    }

    #[test]
    fn test_duplicate_names_subscribe_once() {
        let events = Events::new();
        events.on("a a  a", |_| {});
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_off_listener() {
        let events = Events::new();
        let parent = ViewId::new("view1");
        let other = ViewId::new("view2");

        events.subscribe("a b", Some(parent.clone()), false, Rc::new(|_: &Event| {}));
        events.subscribe("a", Some(other.clone()), false, Rc::new(|_: &Event| {}));
        events.on("a", |_| {});

        assert!(events.has_listener(&parent));
        assert_eq!(events.off_listener(&parent), 2);
        assert!(!events.has_listener(&parent));
        assert!(events.has_listener(&other));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_handler_can_unsubscribe_during_trigger() {
        let events = Rc::new(Events::new());
        let count = Rc::new(Cell::new(0));

        let events_clone = events.clone();
        let first = events.on("evt", move |_| {
            events_clone.off_event("evt");
        });
        let count_clone = count.clone();
        events.on("evt", move |_| count_clone.set(count_clone.get() + 1));

        // Snapshot: the second handler still runs this round
        assert_eq!(events.trigger("evt", &source()), 2);
        assert_eq!(count.get(), 1);

        assert!(!events.off(first));
        assert_eq!(events.trigger("evt", &source()), 0);
    }

    #[test]
    fn test_reentrant_trigger() {
        let events = Rc::new(Events::new());
        let count = Rc::new(Cell::new(0));

        let events_clone = events.clone();
        events.once("remove", move |event| {
            events_clone.trigger("dispose", &event.source);
        });
        let count_clone = count.clone();
        events.on("dispose", move |_| count_clone.set(count_clone.get() + 1));

        events.trigger("remove", &source());
        events.trigger("remove", &source());
        assert_eq!(count.get(), 1);
    }
}
