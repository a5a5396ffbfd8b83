//! Subview Registry - Id → handle cache owned by one host view.
//!
//! Manages the lifecycle of registered subviews:
//! - Lazy materialization (no map until the first registration)
//! - One-time teardown listener per registration, so a child that signals
//!   `remove`/`dispose` drops out of the cache on its own
//! - Removal procedure: host stops listening to the child, then the child
//!   removes itself
//! - Reactive size (`count_signal`) for deriveds that depend on it
//!
//! No `RefCell` borrow of the map is held while a child runs code, so
//! children may re-enter the registry from their `remove`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use spark_signals::{signal, Signal};
use tracing::{debug, trace};

use crate::types::{AutoRemove, ViewId};
use crate::view::{Listener, View, ViewCore};

/// Handle to a registered subview.
pub type SubView = Rc<dyn View>;

type Entries = RefCell<Option<HashMap<ViewId, SubView>>>;

// =============================================================================
// Conversions
// =============================================================================

/// Anything that designates exactly one view handle.
pub trait IntoSubView {
    fn into_sub_view(self) -> SubView;
}

impl<V: View> IntoSubView for Rc<V> {
    fn into_sub_view(self) -> SubView {
        self
    }
}

impl IntoSubView for Rc<dyn View> {
    fn into_sub_view(self) -> SubView {
        self
    }
}

/// A single handle or a list of handles; a single handle is a one-element list.
pub trait IntoSubViews {
    fn into_sub_views(self) -> Vec<SubView>;
}

impl<V: View> IntoSubViews for Rc<V> {
    fn into_sub_views(self) -> Vec<SubView> {
        vec![self.into_sub_view()]
    }
}

impl IntoSubViews for Rc<dyn View> {
    fn into_sub_views(self) -> Vec<SubView> {
        vec![self]
    }
}

impl<T: IntoSubView> IntoSubViews for Vec<T> {
    fn into_sub_views(self) -> Vec<SubView> {
        self.into_iter().map(IntoSubView::into_sub_view).collect()
    }
}

impl<T: IntoSubView, const N: usize> IntoSubViews for [T; N] {
    fn into_sub_views(self) -> Vec<SubView> {
        self.into_iter().map(IntoSubView::into_sub_view).collect()
    }
}

// =============================================================================
// SubViews
// =============================================================================

/// Registry state a host view embeds as a field.
///
/// Hosts use it through [`Composite`](super::Composite); the methods here are
/// the read side plus configuration.
pub struct SubViews {
    entries: Rc<Entries>,
    count: Signal<usize>,
    auto_remove: Cell<AutoRemove>,
}

impl SubViews {
    pub fn new() -> Self {
        Self::with_auto_remove(AutoRemove::default())
    }

    /// Registry whose children are dropped automatically on the given signals.
    pub fn with_auto_remove(auto_remove: AutoRemove) -> Self {
        Self {
            entries: Rc::new(RefCell::new(None)),
            count: signal(0usize),
            auto_remove: Cell::new(auto_remove),
        }
    }

    pub fn auto_remove(&self) -> AutoRemove {
        self.auto_remove.get()
    }

    /// Applies to subviews registered from now on.
    pub fn set_auto_remove(&self, auto_remove: AutoRemove) {
        self.auto_remove.set(auto_remove);
    }

    /// Create the backing map, replacing any previous one.
    ///
    /// Entries of a replaced map are forgotten, not removed.
    pub fn initialize(&self) {
        let previous = self.entries.replace(Some(HashMap::new()));
        if let Some(previous) = &previous {
            if !previous.is_empty() {
                debug!(dropped = previous.len(), "subview registry reinitialized");
            }
        }
        self.count.set(0);
    }

    /// Create the backing map if it does not exist yet.
    pub fn ensure(&self) {
        if !self.is_initialized() {
            self.initialize();
        }
    }

    /// False until the first registration or explicit initialization.
    pub fn is_initialized(&self) -> bool {
        self.entries.borrow().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registry size as a signal.
    ///
    /// Reading it inside a derived or effect creates a reactive dependency;
    /// it is updated after every registration and removal.
    pub fn count_signal(&self) -> Signal<usize> {
        self.count.clone()
    }

    pub fn get(&self, id: &str) -> Option<SubView> {
        self.entries
            .borrow()
            .as_ref()
            .and_then(|map| map.get(id).cloned())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries
            .borrow()
            .as_ref()
            .is_some_and(|map| map.contains_key(id))
    }

    /// Snapshot of the registered ids, in no particular order.
    pub fn ids(&self) -> Vec<ViewId> {
        self.entries
            .borrow()
            .as_ref()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the registered handles, in no particular order.
    pub fn views(&self) -> Vec<SubView> {
        self.entries
            .borrow()
            .as_ref()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Mutation (driven by Composite)
    // =========================================================================

    /// Register `view` under its id and install its teardown listener.
    pub(crate) fn insert(&self, host: &ViewCore, view: SubView) {
        let id = view.cid().clone();

        let previous = self
            .entries
            .borrow_mut()
            .get_or_insert_with(HashMap::new)
            .insert(id.clone(), view.clone());
        if previous.is_some() {
            trace!(host = %host.cid(), sub_view = %id, "subview registered again, handle replaced");
        } else {
            trace!(host = %host.cid(), sub_view = %id, "subview registered");
        }
        drop(previous);

        let names = self.auto_remove.get().event_names();
        if !names.is_empty() {
            let entries = Rc::downgrade(&self.entries);
            let count = self.count.clone();
            let listener = host.listener();
            let child = Rc::downgrade(&view);

            host.listen_to_once(view.core(), &names, move |event| {
                trace!(
                    host = %listener.cid(),
                    sub_view = %id,
                    event = %event.name,
                    "subview signalled teardown"
                );
                let Some(child) = child.upgrade() else {
                    return;
                };
                detach(&listener, child.as_ref());
                if let Some(entries) = entries.upgrade() {
                    delete_if_current(&entries, &count, id.as_str(), &child);
                }
            });
        }

        self.sync_count();
    }

    /// Run the removal procedure on `id` and delete it.
    ///
    /// Returns false if `id` is not registered.
    pub(crate) fn remove(&self, host: &ViewCore, id: &str) -> bool {
        let Some(view) = self.get(id) else {
            return false;
        };

        detach(&host.listener(), view.as_ref());
        delete(&self.entries, &self.count, id);
        trace!(host = %host.cid(), sub_view = id, "subview removed");
        true
    }

    /// Run the removal procedure on every subview, then empty the map at once.
    ///
    /// Returns the number of removed subviews. Leaves an uninitialized
    /// registry uninitialized.
    pub(crate) fn clear(&self, host: &ViewCore) -> usize {
        if !self.is_initialized() {
            return 0;
        }

        let views = self.views();
        let listener = host.listener();
        for view in &views {
            detach(&listener, view.as_ref());
        }

        let drained = self.entries.borrow_mut().as_mut().map(std::mem::take);
        drop(drained);
        self.count.set(0);

        debug!(host = %host.cid(), count = views.len(), "removed all subviews");
        views.len()
    }

    fn sync_count(&self) {
        let len = self.len();
        self.count.set(len);
    }
}

impl Default for SubViews {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubViews {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubViews")
            .field("initialized", &self.is_initialized())
            .field("ids", &self.ids())
            .field("auto_remove", &self.auto_remove.get())
            .finish()
    }
}

// =============================================================================
// Removal procedure
// =============================================================================

/// Host stops listening to `view`, then `view` removes itself.
///
/// Safe to run more than once on the same view.
fn detach(listener: &Listener, view: &dyn View) {
    listener.stop_listening(view.core());
    view.remove();
}

/// Delete `id` from the map; missing ids and missing maps are no-ops.
fn delete(entries: &Entries, count: &Signal<usize>, id: &str) {
    let removed = entries.borrow_mut().as_mut().and_then(|map| map.remove(id));
    if removed.is_none() {
        return;
    }
    drop(removed);

    let len = entries.borrow().as_ref().map_or(0, HashMap::len);
    count.set(len);
}

/// Delete `id` only while it still maps to `view`.
///
/// A handle registered later under the same id keeps its entry.
fn delete_if_current(entries: &Entries, count: &Signal<usize>, id: &str, view: &SubView) {
    let current = entries
        .borrow()
        .as_ref()
        .and_then(|map| map.get(id))
        .is_some_and(|entry| Rc::ptr_eq(entry, view));
    if current {
        delete(entries, count, id);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::BaseView;

    fn view() -> Rc<BaseView> {
        Rc::new(BaseView::default())
    }

    #[test]
    fn test_lazy_initialization() {
        let registry = SubViews::new();
        assert!(!registry.is_initialized());
        assert!(registry.is_empty());

        registry.ensure();
        assert!(registry.is_initialized());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_insert_and_remove() {
        let host = BaseView::default();
        let registry = SubViews::new();
        let child = view();

        registry.insert(host.core(), child.clone());
        assert!(registry.is_initialized());
        assert!(registry.contains(child.cid().as_str()));
        assert_eq!(registry.ids(), vec![child.cid().clone()]);
        assert!(host.core().is_listening_to(child.core()));

        assert!(registry.remove(host.core(), child.cid().as_str()));
        assert!(!registry.contains(child.cid().as_str()));
        assert!(!host.core().is_listening_to(child.core()));
        assert!(child.core().is_removed());

        assert!(!registry.remove(host.core(), child.cid().as_str()));
    }

    #[test]
    fn test_initialize_replaces_map() {
        let host = BaseView::default();
        let registry = SubViews::new();
        registry.insert(host.core(), view());
        assert_eq!(registry.len(), 1);

        registry.initialize();
        assert!(registry.is_initialized());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.count_signal().get(), 0);
    }

    #[test]
    fn test_clear_uninitialized() {
        let host = BaseView::default();
        let registry = SubViews::new();

        assert_eq!(registry.clear(host.core()), 0);
        assert!(!registry.is_initialized());
    }

    #[test]
    fn test_auto_remove_disabled() {
        let host = BaseView::default();
        let registry = SubViews::with_auto_remove(AutoRemove::empty());
        let child = view();

        registry.insert(host.core(), child.clone());
        assert!(!host.core().is_listening_to(child.core()));

        child.trigger("remove");
        assert!(registry.contains(child.cid().as_str()));
    }

    #[test]
    fn test_auto_remove_only_dispose() {
        let host = BaseView::default();
        let registry = SubViews::new();
        registry.set_auto_remove(AutoRemove::DISPOSE);
        let child = view();

        registry.insert(host.core(), child.clone());

        child.trigger("remove");
        assert!(registry.contains(child.cid().as_str()));

        child.trigger("dispose");
        assert!(!registry.contains(child.cid().as_str()));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let entries: Entries = RefCell::new(None);
        let count = signal(3usize);

        delete(&entries, &count, "view1");
        assert!(entries.borrow().is_none());
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_debug_lists_ids() {
        let host = BaseView::default();
        let registry = SubViews::new();
        let child = view();
        registry.insert(host.core(), child.clone());

        let debug = format!("{registry:?}");
        assert!(debug.contains(child.cid().as_str()));
    }
}
