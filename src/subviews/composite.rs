//! Composite - Subview management for any host view.
//!
//! Implement [`Composite::sub_views`] to expose a [`SubViews`] field and every
//! registry operation comes with it as a default method. A host overriding
//! [`View::remove`] calls [`Composite::remove_with_sub_views`] so that no
//! child outlives its parent.
//!
//! ```ignore
//! struct ListView {
//!     core: ViewCore,
//!     sub_views: SubViews,
//! }
//!
//! impl View for ListView {
//!     fn core(&self) -> &ViewCore { &self.core }
//!     fn remove(&self) { self.remove_with_sub_views(); }
//! }
//!
//! impl Composite for ListView {
//!     fn sub_views(&self) -> &SubViews { &self.sub_views }
//! }
//! ```

use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::SelectorError;
use crate::types::SubViewRef;
use crate::view::{Element, View, ViewCore, ViewOptions};

use super::registry::{IntoSubView, IntoSubViews, SubView, SubViews};

/// What a selector-driven factory receives for each matched element.
#[derive(Debug, Clone)]
pub struct AttachContext {
    /// The matched element.
    pub element: Element,
    /// Position of the element among all matches, in document order.
    pub index: usize,
}

pub trait Composite: View {
    /// The registry this host owns.
    fn sub_views(&self) -> &SubViews;

    /// Create an empty registry, replacing any existing one.
    ///
    /// Never required: every registration initializes the registry on demand.
    fn initialize_sub_views(&self) -> &Self {
        self.sub_views().initialize();
        self
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register one view or a list of views. An empty list does nothing.
    ///
    /// Each view is dropped from the registry on its own when it triggers
    /// `remove` or `dispose` (see [`SubViews::set_auto_remove`]).
    fn add_sub_views(&self, views: impl IntoSubViews) -> &Self {
        let views = views.into_sub_views();
        if views.is_empty() {
            return self;
        }

        let registry = self.sub_views();
        registry.ensure();
        for view in views {
            registry.insert(self.core(), view);
        }
        self
    }

    /// Build a view with `constructor(options)`, register it and return it.
    fn init_sub_view<V, O, F>(&self, constructor: F, options: O) -> Rc<V>
    where
        V: View,
        F: FnOnce(O) -> V,
    {
        let view = Rc::new(constructor(options));
        self.add_sub_views(view.clone());
        view
    }

    /// Like [`Composite::init_sub_view`] for fallible constructors.
    ///
    /// The constructor's error is returned as is; nothing is registered then.
    fn try_init_sub_view<V, O, E, F>(&self, constructor: F, options: O) -> Result<Rc<V>, E>
    where
        V: View,
        F: FnOnce(O) -> Result<V, E>,
    {
        let view = Rc::new(constructor(options)?);
        self.add_sub_views(view.clone());
        Ok(view)
    }

    /// Register one view per element of this host matching `selector`.
    ///
    /// `factory` runs once per match, in document order. With no match the
    /// factory never runs and the registry is untouched.
    fn attach_sub_views<F, S>(&self, selector: &str, mut factory: F) -> Result<&Self, SelectorError>
    where
        F: FnMut(AttachContext) -> S,
        S: IntoSubView,
    {
        let elements = self.core().query(selector).inspect_err(|err| {
            warn!(host = %self.cid(), selector, error = %err, "cannot attach subviews");
        })?;
        if elements.is_empty() {
            return Ok(self);
        }

        let registry = self.sub_views();
        registry.ensure();
        for (index, element) in elements.into_iter().enumerate() {
            let view = factory(AttachContext { element, index }).into_sub_view();
            registry.insert(self.core(), view);
        }
        Ok(self)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// The subview registered under an id or a handle.
    ///
    /// `None` for unknown ids, absent arguments and empty registries.
    fn get_sub_view<'a>(&self, view: impl Into<SubViewRef<'a>>) -> Option<SubView> {
        if !self.has_sub_views() {
            return None;
        }
        view.into()
            .resolve()
            .and_then(|id| self.sub_views().get(id))
    }

    /// Like [`Composite::get_sub_view`], downcast to a concrete view type.
    fn get_sub_view_as<'a, V: View>(&self, view: impl Into<SubViewRef<'a>>) -> Option<Rc<V>> {
        self.get_sub_view(view)?.into_any_rc().downcast::<V>().ok()
    }

    /// Snapshot of all subviews, in no particular order.
    ///
    /// For a single subview use [`Composite::get_sub_view`].
    fn get_sub_views(&self) -> Vec<SubView> {
        self.sub_views().views()
    }

    fn has_sub_views(&self) -> bool {
        !self.sub_views().is_empty()
    }

    fn sub_view_count(&self) -> usize {
        self.sub_views().len()
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove the subview registered under an id or a handle.
    ///
    /// The host stops listening to it, its `remove` runs, and its entry is
    /// deleted. Unknown ids and absent arguments do nothing.
    fn remove_sub_view<'a>(&self, view: impl Into<SubViewRef<'a>>) -> &Self {
        if let Some(id) = view.into().resolve() {
            self.sub_views().remove(self.core(), id);
        }
        self
    }

    /// Remove each listed subview, see [`Composite::remove_sub_view`].
    fn remove_sub_views<'a, I>(&self, views: I) -> &Self
    where
        I: IntoIterator,
        I::Item: Into<SubViewRef<'a>>,
    {
        if !self.has_sub_views() {
            return self;
        }
        for view in views {
            self.remove_sub_view(view);
        }
        self
    }

    /// Remove every subview, then empty the registry in one step.
    fn remove_all_sub_views(&self) -> &Self {
        if self.has_sub_views() {
            self.sub_views().clear(self.core());
        }
        self
    }

    /// Cascading teardown: all subviews first, then the host itself.
    fn remove_with_sub_views(&self) {
        debug!(host = %self.cid(), sub_views = self.sub_view_count(), "removing view and its subviews");
        self.remove_all_sub_views();
        self.core().remove();
    }
}

// =============================================================================
// CompositeView
// =============================================================================

/// A ready-made host view: a plain view plus a subview registry.
///
/// Removing it removes its subviews first.
pub struct CompositeView {
    core: ViewCore,
    sub_views: SubViews,
}

impl CompositeView {
    pub fn new(options: ViewOptions) -> Self {
        Self {
            core: ViewCore::new(options),
            sub_views: SubViews::new(),
        }
    }
}

impl Default for CompositeView {
    fn default() -> Self {
        Self::new(ViewOptions::default())
    }
}

impl View for CompositeView {
    fn core(&self) -> &ViewCore {
        &self.core
    }

    fn remove(&self) {
        self.remove_with_sub_views();
    }
}

impl Composite for CompositeView {
    fn sub_views(&self) -> &SubViews {
        &self.sub_views
    }
}

// =============================================================================
// Tests
// =============================================================================
