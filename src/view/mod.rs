//! View Framework - The host surface subview registries are built on.
//!
//! A view is anything implementing [`View`]: it exposes a [`ViewCore`] holding
//! its id, its root [`Element`], its [`Events`] table and the bookkeeping of
//! which other views it listens to.
//!
//! - [`element`] - Reference-counted element tree
//! - [`selector`] - CSS subset for scoped queries
//! - [`events`] - Named events, `on`/`once`/`off`/`trigger`
//!
//! # Listening
//!
//! `a.core().listen_to(b.core(), "evt", handler)` subscribes on `b`'s table
//! tagged with `a`'s id, so `a.core().stop_listening(b.core())` can drop
//! exactly those subscriptions later, and removing `a` drops all of them.
//!
//! ```ignore
//! let parent = BaseView::default();
//! let child = BaseView::default();
//!
//! parent.core().listen_to(child.core(), "evt", |event| println!("{}", event.name));
//! child.trigger("evt");
//!
//! parent.core().stop_listening(child.core());
//! child.trigger("evt"); // nothing
//! ```

pub mod element;
pub mod events;
pub mod selector;

pub use element::Element;
pub use events::{Event, EventHandler, Events, SubscriptionId};
pub use selector::Selector;

use std::any::{self, Any};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::types::ViewId;

// =============================================================================
// Id allocation
// =============================================================================

thread_local! {
    /// Counter for generating unique view ids.
    static ID_COUNTER: Cell<usize> = const { Cell::new(0) };
}

/// Allocate a fresh view id (`view1`, `view2`, ...).
pub fn unique_view_id() -> ViewId {
    ID_COUNTER.with(|counter| {
        let next = counter.get() + 1;
        counter.set(next);
        ViewId::new(format!("view{next}"))
    })
}

// =============================================================================
// View trait
// =============================================================================

/// Type-erased access to a view, implemented for every [`View`].
pub trait AnyView {
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: View> AnyView for T {
    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// A view instance.
///
/// Only [`View::core`] is required. Implementors overriding [`View::remove`]
/// must keep it idempotent: registries may call it on a view that already
/// removed itself.
pub trait View: AnyView + 'static {
    fn core(&self) -> &ViewCore;

    fn cid(&self) -> &ViewId {
        self.core().cid()
    }

    fn el(&self) -> &Element {
        self.core().el()
    }

    /// Detach from the element tree and stop listening to other views.
    fn remove(&self) {
        self.core().remove();
    }

    fn trigger(&self, event: &str) -> usize {
        self.core().trigger(event)
    }
}

// =============================================================================
// ViewOptions
// =============================================================================

/// Construction options for [`ViewCore`].
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Tag of the root element when `el` is not given.
    pub tag_name: String,
    pub id: Option<String>,
    /// Whitespace separated classes added to the root element.
    pub class_name: Option<String>,
    pub attributes: Vec<(String, String)>,
    /// Adopt an existing element instead of creating one.
    pub el: Option<Element>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            tag_name: "div".to_string(),
            id: None,
            class_name: None,
            attributes: Vec::new(),
            el: None,
        }
    }
}

impl ViewOptions {
    /// Options adopting `el` as root element.
    pub fn with_el(el: Element) -> Self {
        Self {
            el: Some(el),
            ..Self::default()
        }
    }
}

// =============================================================================
// ViewCore
// =============================================================================

type ListeningMap = RefCell<HashMap<ViewId, Weak<Events>>>;

/// State shared by every view.
pub struct ViewCore {
    cid: ViewId,
    el: Element,
    events: Rc<Events>,
    /// Views this one holds subscriptions on.
    listening: Rc<ListeningMap>,
    removed: Cell<bool>,
}

impl ViewCore {
    pub fn new(options: ViewOptions) -> Self {
        let el = options
            .el
            .unwrap_or_else(|| Element::new(options.tag_name));
        if let Some(id) = options.id {
            el.set_attr("id", id);
        }
        if let Some(class_name) = options.class_name {
            el.add_class(&class_name);
        }
        for (name, value) in options.attributes {
            el.set_attr(name, value);
        }

        Self {
            cid: unique_view_id(),
            el,
            events: Rc::new(Events::new()),
            listening: Rc::new(RefCell::new(HashMap::new())),
            removed: Cell::new(false),
        }
    }

    pub fn cid(&self) -> &ViewId {
        &self.cid
    }

    pub fn el(&self) -> &Element {
        &self.el
    }

    pub fn events(&self) -> &Events {
        &self.events
    }

    /// Query the view's subtree. See [`Element::query`].
    pub fn query(&self, selector: &str) -> Result<Vec<Element>, crate::error::SelectorError> {
        self.el.query(selector)
    }

    pub fn trigger(&self, event: &str) -> usize {
        self.events.trigger(event, &self.cid)
    }

    // =========================================================================
    // Listening
    // =========================================================================

    /// Subscribe to `events` on `source`, on behalf of this view.
    pub fn listen_to<F>(&self, source: &ViewCore, events: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + 'static,
    {
        self.subscribe_on(source, events, false, Rc::new(handler))
    }

    /// Like [`ViewCore::listen_to`], dropped after the first matching event.
    pub fn listen_to_once<F>(&self, source: &ViewCore, events: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + 'static,
    {
        self.subscribe_on(source, events, true, Rc::new(handler))
    }

    fn subscribe_on(
        &self,
        source: &ViewCore,
        events: &str,
        once: bool,
        handler: EventHandler,
    ) -> SubscriptionId {
        let id = source
            .events
            .subscribe(events, Some(self.cid.clone()), once, handler);
        self.listening
            .borrow_mut()
            .insert(source.cid.clone(), Rc::downgrade(&source.events));
        id
    }

    /// Drop every subscription this view holds on `source`.
    pub fn stop_listening(&self, source: &ViewCore) {
        self.listener().stop_listening(source);
    }

    /// Drop every subscription this view holds, on any view.
    pub fn stop_listening_to_all(&self) {
        let sources: Vec<Weak<Events>> = self
            .listening
            .borrow_mut()
            .drain()
            .map(|(_, events)| events)
            .collect();

        for events in sources {
            if let Some(events) = events.upgrade() {
                events.off_listener(&self.cid);
            }
        }
    }

    /// True if this view holds at least one subscription on `source`.
    pub fn is_listening_to(&self, source: &ViewCore) -> bool {
        source.events.has_listener(&self.cid)
    }

    /// Detached handle able to unsubscribe this view, usable from callbacks
    /// that must not borrow the view itself.
    pub fn listener(&self) -> Listener {
        Listener {
            cid: self.cid.clone(),
            listening: Rc::downgrade(&self.listening),
        }
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Detach the root element and stop listening to other views.
    ///
    /// Returns true on the first call only; later calls do nothing.
    pub fn remove(&self) -> bool {
        if self.removed.replace(true) {
            return false;
        }

        self.el.detach();
        self.stop_listening_to_all();
        trace!(view = %self.cid, "view removed");
        true
    }

    pub fn is_removed(&self) -> bool {
        self.removed.get()
    }
}

/// See [`ViewCore::listener`].
#[derive(Clone)]
pub struct Listener {
    cid: ViewId,
    listening: Weak<ListeningMap>,
}

impl Listener {
    pub fn cid(&self) -> &ViewId {
        &self.cid
    }

    /// Drop every subscription the listening view holds on `source`.
    pub fn stop_listening(&self, source: &ViewCore) {
        source.events.off_listener(&self.cid);
        if let Some(listening) = self.listening.upgrade() {
            listening.borrow_mut().remove(&source.cid);
        }
    }
}

// =============================================================================
// BaseView
// =============================================================================

/// A plain view with no behavior of its own.
pub struct BaseView {
    core: ViewCore,
}

impl BaseView {
    pub fn new(options: ViewOptions) -> Self {
        Self {
            core: ViewCore::new(options),
        }
    }
}

impl Default for BaseView {
    fn default() -> Self {
        Self::new(ViewOptions::default())
    }
}

impl View for BaseView {
    fn core(&self) -> &ViewCore {
        &self.core
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids() {
        let a = BaseView::default();
        let b = BaseView::default();

        assert_ne!(a.cid(), b.cid());
        assert!(a.cid().as_str().starts_with("view"));
    }

    #[test]
    fn test_options_build_root_element() {
        let view = BaseView::new(ViewOptions {
            tag_name: "section".to_string(),
            id: Some("main".to_string()),
            class_name: Some("panel wide".to_string()),
            attributes: vec![("data-role".to_string(), "list".to_string())],
            el: None,
        });

        assert_eq!(view.el().tag(), "section");
        assert_eq!(view.el().id().as_deref(), Some("main"));
        assert!(view.el().has_class("wide"));
        assert_eq!(view.el().attr("data-role").as_deref(), Some("list"));
    }

    #[test]
    fn test_adopts_existing_element() {
        let el = Element::new("li");
        let view = BaseView::new(ViewOptions::with_el(el.clone()));
        assert!(view.el().ptr_eq(&el));
    }

    #[test]
    fn test_listen_and_stop_listening() {
        use std::cell::Cell;

        let parent = BaseView::default();
        let child = BaseView::default();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();

        parent
            .core()
            .listen_to(child.core(), "evt", move |_| count_clone.set(count_clone.get() + 1));
        assert!(parent.core().is_listening_to(child.core()));

        child.trigger("evt");
        assert_eq!(count.get(), 1);

        parent.core().stop_listening(child.core());
        assert!(!parent.core().is_listening_to(child.core()));

        child.trigger("evt");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_stop_listening_keeps_other_listeners() {
        let parent = BaseView::default();
        let other = BaseView::default();
        let child = BaseView::default();

        parent.core().listen_to(child.core(), "evt", |_| {});
        other.core().listen_to(child.core(), "evt", |_| {});
        child.core().events().on("evt", |_| {});

        parent.core().stop_listening(child.core());

        assert!(other.core().is_listening_to(child.core()));
        assert_eq!(child.core().events().len(), 2);
    }

    #[test]
    fn test_listen_to_once() {
        use std::cell::Cell;

        let parent = BaseView::default();
        let child = BaseView::default();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();

        parent.core().listen_to_once(child.core(), "remove dispose", move |_| {
            count_clone.set(count_clone.get() + 1)
        });

        child.trigger("dispose");
        child.trigger("remove");
        assert_eq!(count.get(), 1);
        assert!(!parent.core().is_listening_to(child.core()));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let root = Element::new("body");
        let parent = BaseView::default();
        let child = BaseView::default();
        root.append(parent.el());
        parent.core().listen_to(child.core(), "evt", |_| {});

        assert!(parent.core().remove());
        assert!(parent.core().is_removed());
        assert!(!parent.el().is_attached());
        assert!(!parent.core().is_listening_to(child.core()));

        assert!(!parent.core().remove());
    }

    #[test]
    fn test_listener_outlives_view() {
        let child = BaseView::default();
        let listener = {
            let parent = BaseView::default();
            parent.core().listen_to(child.core(), "evt", |_| {});
            parent.core().listener()
        };

        listener.stop_listening(child.core());
        assert!(child.core().events().is_empty());
    }

    #[test]
    fn test_downcast() {
        let view: Rc<dyn View> = Rc::new(BaseView::default());
        assert!(view.as_any().is::<BaseView>());
        assert!(view.type_name().ends_with("BaseView"));
        assert!(view.into_any_rc().downcast::<BaseView>().is_ok());
    }
}
