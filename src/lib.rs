//! # spark-subviews
//!
//! Subview management for retained view hierarchies.
//!
//! A composite view keeps an id → handle cache of its child views. Children
//! are registered directly, built from a constructor, or attached to elements
//! matched by a selector inside the parent's subtree. They leave the cache
//! when removed explicitly, when they signal their own teardown, or when the
//! parent itself is removed.
//!
//! Registry size is exposed as a [spark-signals](https://github.com/RLabs-Inc/spark-signals)
//! `Signal`, so deriveds and effects can react to children coming and going.
//! Registration and teardown are reported through `tracing`.
//!
//! ## Modules
//!
//! - [`types`] - View ids, id-or-handle references, auto-remove flags
//! - [`view`] - Minimal host view framework (elements, selectors, events)
//! - [`subviews`] - The registry and the `Composite` trait
//! - [`error`] - Selector errors

pub mod error;
pub mod subviews;
pub mod types;
pub mod view;

// Re-export commonly used items
pub use types::*;

pub use error::SelectorError;

pub use view::{
    unique_view_id, AnyView, BaseView, Element, Event, EventHandler, Events, Listener,
    Selector, SubscriptionId, View, ViewCore, ViewOptions,
};

pub use subviews::{
    AttachContext, Composite, CompositeView, IntoSubView, IntoSubViews, SubView, SubViews,
};
