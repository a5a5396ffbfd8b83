//! Element Tree - The node structure a view renders into.
//!
//! Elements are reference-counted nodes. A parent owns its children; a child
//! only keeps a weak link back to its parent, so detaching a subtree is enough
//! to release it.
//!
//! # Example
//!
//! ```ignore
//! use spark_subviews::view::Element;
//!
//! let list = Element::new("ul")
//!     .with_child(Element::new("li").with_class("item"))
//!     .with_child(Element::new("li").with_class("item"));
//!
//! let items = list.query(".item")?;
//! assert_eq!(items.len(), 2);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::error::SelectorError;
use super::selector::Selector;

struct Node {
    tag: String,
    attrs: RefCell<Vec<(String, String)>>,
    text: RefCell<String>,
    children: RefCell<Vec<Element>>,
    parent: RefCell<Weak<Node>>,
}

/// Shared handle to a node of the element tree.
///
/// Cloning the handle does not clone the node; use [`Element::ptr_eq`] to
/// compare identity.
#[derive(Clone)]
pub struct Element(Rc<Node>);

impl Element {
    /// Create a detached element. The tag is stored lowercase.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Rc::new(Node {
            tag: tag.into().to_ascii_lowercase(),
            attrs: RefCell::new(Vec::new()),
            text: RefCell::new(String::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
        }))
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.set_attr("id", id);
        self
    }

    pub fn with_class(self, class: impl AsRef<str>) -> Self {
        self.add_class(class.as_ref());
        self
    }

    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub fn with_child(self, child: Element) -> Self {
        self.append(&child);
        self
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    pub fn id(&self) -> Option<String> {
        self.attr("id")
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.0
            .attrs
            .borrow()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let mut attrs = self.0.attrs.borrow_mut();
        match attrs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => attrs.push((name, value)),
        }
    }

    /// Class names, in attribute order.
    pub fn classes(&self) -> Vec<String> {
        self.attr("class")
            .map(|classes| classes.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Add one or more whitespace separated classes. Existing classes are kept once.
    pub fn add_class(&self, classes: &str) {
        let mut current = self.classes();
        for class in classes.split_whitespace() {
            if !current.iter().any(|c| c == class) {
                current.push(class.to_string());
            }
        }
        if !current.is_empty() {
            self.set_attr("class", current.join(" "));
        }
    }

    pub fn text(&self) -> String {
        self.0.text.borrow().clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.0.text.borrow_mut() = text.into();
    }

    // =========================================================================
    // Tree
    // =========================================================================

    pub fn parent(&self) -> Option<Element> {
        self.0.parent.borrow().upgrade().map(Element)
    }

    /// Snapshot of the direct children.
    pub fn children(&self) -> Vec<Element> {
        self.0.children.borrow().clone()
    }

    /// Append `child` as last child, moving it out of its current parent.
    ///
    /// Appending an element into itself or into one of its own descendants
    /// would create a cycle; such calls are ignored.
    pub fn append(&self, child: &Element) {
        if child.contains(self) {
            warn!(parent = %self.tag(), child = %child.tag(), "refusing to append an element into its own subtree");
            return;
        }

        child.detach();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    /// Remove all children.
    pub fn empty(&self) {
        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        for child in children {
            *child.0.parent.borrow_mut() = Weak::new();
        }
    }

    /// Detach from the parent element.
    ///
    /// Returns false if the element had no parent.
    pub fn detach(&self) -> bool {
        let parent = self.0.parent.replace(Weak::new());
        let Some(parent) = parent.upgrade() else {
            return false;
        };

        parent
            .children
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(&c.0, &self.0));
        true
    }

    pub fn is_attached(&self) -> bool {
        self.parent().is_some()
    }

    /// True if `other` is this element or one of its descendants.
    pub fn contains(&self, other: &Element) -> bool {
        let mut current = Some(other.clone());
        while let Some(element) = current {
            if element.ptr_eq(self) {
                return true;
            }
            current = element.parent();
        }
        false
    }

    /// All descendants (not including `self`) in document order.
    pub fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let mut stack: Vec<Element> = self.children().into_iter().rev().collect();
        while let Some(element) = stack.pop() {
            stack.extend(element.children().into_iter().rev());
            out.push(element);
        }
        out
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Descendants matching `selector`, in document order.
    pub fn query(&self, selector: &str) -> Result<Vec<Element>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.select(&selector))
    }

    /// Descendants matching an already parsed selector, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<Element> {
        self.descendants()
            .into_iter()
            .filter(|element| selector.matches(element))
            .collect()
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Serialize the subtree as markup. Text is written verbatim.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.0.tag);
        for (name, value) in self.0.attrs.borrow().iter() {
            out.push_str(&format!(" {name}=\"{value}\""));
        }
        out.push('>');
        out.push_str(&self.0.text.borrow());
        for child in self.0.children.borrow().iter() {
            child.write_markup(out);
        }
        out.push_str("</");
        out.push_str(&self.0.tag);
        out.push('>');
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.0.tag)
            .field("attrs", &self.0.attrs.borrow())
            .field("children", &self.0.children.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> Element {
        Element::new("ul")
            .with_id("list")
            .with_child(Element::new("li").with_class("item").with_text("a"))
            .with_child(
                Element::new("li")
                    .with_class("item selected")
                    .with_child(Element::new("span").with_class("item")),
            )
            .with_child(Element::new("li").with_text("c"))
    }

    #[test]
    fn test_append_and_detach() {
        let parent = Element::new("div");
        let child = Element::new("span");

        parent.append(&child);
        assert!(child.is_attached());
        assert!(child.parent().unwrap().ptr_eq(&parent));
        assert_eq!(parent.children().len(), 1);

        assert!(child.detach());
        assert!(!child.is_attached());
        assert!(parent.children().is_empty());

        // Second detach is a no-op
        assert!(!child.detach());
    }

    #[test]
    fn test_append_moves_between_parents() {
        let first = Element::new("div");
        let second = Element::new("div");
        let child = Element::new("p");

        first.append(&child);
        second.append(&child);

        assert!(first.children().is_empty());
        assert_eq!(second.children().len(), 1);
        assert!(child.parent().unwrap().ptr_eq(&second));
    }

    #[test]
    fn test_append_into_own_subtree_is_ignored() {
        let root = Element::new("div");
        let inner = Element::new("div");
        root.append(&inner);

        inner.append(&root);
        assert!(root.parent().is_none());
        assert!(inner.children().is_empty());
    }

    #[test]
    fn test_classes() {
        let el = Element::new("DIV").with_class("a b").with_class("b c");
        assert_eq!(el.tag(), "div");
        assert_eq!(el.classes(), vec!["a", "b", "c"]);
        assert!(el.has_class("c"));
        assert!(!el.has_class("d"));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = list();
        let tags: Vec<String> = root
            .descendants()
            .iter()
            .map(|e| e.tag().to_string())
            .collect();
        assert_eq!(tags, vec!["li", "li", "span", "li"]);
    }

    #[test]
    fn test_query_excludes_root() {
        let root = list().with_class("item");
        let items = root.query(".item").unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|e| !e.ptr_eq(&root)));
        assert_eq!(items[0].text(), "a");
        assert_eq!(items[2].tag(), "span");
    }

    #[test]
    fn test_query_no_match() {
        let root = list();
        assert!(root.query(".missing").unwrap().is_empty());
    }

    #[test]
    fn test_query_invalid_selector() {
        let root = list();
        assert_eq!(root.query("  ").unwrap_err(), SelectorError::Empty);
    }

    #[test]
    fn test_to_markup() {
        let el = Element::new("p").with_class("note").with_text("hi");
        assert_eq!(el.to_markup(), "<p class=\"note\">hi</p>");
    }
}
