//! Core types for spark-subviews.
//!
//! Identifiers, teardown signal flags and the id-or-handle argument type that
//! every registry lookup and removal goes through.

use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::view::View;

// =============================================================================
// ViewId
// =============================================================================

/// Stable identifier of a view instance.
///
/// Assigned once by [`ViewCore::new`](crate::view::ViewCore::new) and never
/// reused while the view is alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(String);

impl ViewId {
    /// Wrap an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ViewId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ViewId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ViewId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ViewId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for ViewId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ViewId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// =============================================================================
// Teardown signals
// =============================================================================

/// Event a view triggers once it has removed itself.
pub const REMOVE_EVENT: &str = "remove";

/// Event a view triggers when it is disposed without a DOM-level removal.
pub const DISPOSE_EVENT: &str = "dispose";

bitflags! {
    /// Child signals that make a registry drop the child on its own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AutoRemove: u8 {
        /// React to [`REMOVE_EVENT`].
        const REMOVE  = 1 << 0;
        /// React to [`DISPOSE_EVENT`].
        const DISPOSE = 1 << 1;
    }
}

impl Default for AutoRemove {
    fn default() -> Self {
        Self::REMOVE | Self::DISPOSE
    }
}

impl AutoRemove {
    /// Space separated event names, in the form [`Events`](crate::view::Events) accepts.
    ///
    /// Empty when no flag is set.
    pub fn event_names(self) -> String {
        let mut names = Vec::with_capacity(2);
        if self.contains(Self::REMOVE) {
            names.push(REMOVE_EVENT);
        }
        if self.contains(Self::DISPOSE) {
            names.push(DISPOSE_EVENT);
        }
        names.join(" ")
    }
}

// =============================================================================
// SubViewRef
// =============================================================================

/// Argument accepted by subview lookups and removals: an id, a view, or nothing.
///
/// Every form resolves through [`SubViewRef::resolve`]; nothing else probes
/// the argument.
///
/// ```ignore
/// host.get_sub_view("view3");      // by id
/// host.get_sub_view(&child);       // by handle
/// host.get_sub_view(None::<&str>); // resolves to no id, always None
/// ```
#[derive(Clone, Copy)]
pub enum SubViewRef<'a> {
    Id(&'a str),
    View(&'a dyn View),
    None,
}

impl<'a> SubViewRef<'a> {
    /// The view id this argument designates, if any.
    pub fn resolve(self) -> Option<&'a str> {
        match self {
            SubViewRef::Id(id) => Some(id),
            SubViewRef::View(view) => Some(view.cid().as_str()),
            SubViewRef::None => None,
        }
    }
}

impl fmt::Debug for SubViewRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubViewRef::Id(id) => f.debug_tuple("Id").field(id).finish(),
            SubViewRef::View(view) => f.debug_tuple("View").field(&view.cid().as_str()).finish(),
            SubViewRef::None => f.write_str("None"),
        }
    }
}

impl<'a> From<&'a str> for SubViewRef<'a> {
    fn from(id: &'a str) -> Self {
        SubViewRef::Id(id)
    }
}

impl<'a> From<&'a String> for SubViewRef<'a> {
    fn from(id: &'a String) -> Self {
        SubViewRef::Id(id.as_str())
    }
}

impl<'a> From<&'a ViewId> for SubViewRef<'a> {
    fn from(id: &'a ViewId) -> Self {
        SubViewRef::Id(id.as_str())
    }
}

impl<'a> From<&'a dyn View> for SubViewRef<'a> {
    fn from(view: &'a dyn View) -> Self {
        SubViewRef::View(view)
    }
}

impl<'a, V: View> From<&'a Rc<V>> for SubViewRef<'a> {
    fn from(view: &'a Rc<V>) -> Self {
        SubViewRef::View(&**view)
    }
}

impl<'a> From<&'a Rc<dyn View>> for SubViewRef<'a> {
    fn from(view: &'a Rc<dyn View>) -> Self {
        SubViewRef::View(&**view)
    }
}

impl<'a, T> From<Option<T>> for SubViewRef<'a>
where
    T: Into<SubViewRef<'a>>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(SubViewRef::None, Into::into)
    }
}

// =============================================================================
// Tests
// =============================================================================
